use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::AttendanceStatus;

/// Face descriptor vector produced by an embedding extractor.
///
/// Dimension-agnostic: all descriptors compared against each other must
/// share one length, but no particular length is assumed (face-api.js
/// emits 128, FaceNet 512).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor {
    pub values: Vec<f32>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// L2 norm of the vector.
    pub fn l2_norm(&self) -> f32 {
        self.values.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Return a unit-norm copy. A zero vector is returned unchanged.
    pub fn normalized(&self) -> Self {
        let norm = self.l2_norm();
        if norm > 0.0 {
            Self::new(self.values.iter().map(|x| x / norm).collect())
        } else {
            self.clone()
        }
    }
}

/// A person eligible for attendance. Owned by the external people
/// registry; the engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub identity_id: Uuid,
    /// Human-readable external code (staff number / student NIS).
    pub code: String,
    pub display_name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// The enrolled biometric signature for one identity.
///
/// At most one template exists per identity; re-enrollment replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceTemplate {
    pub identity_id: Uuid,
    pub descriptor: Descriptor,
    /// Representative source image retained from enrollment, if any.
    pub evidence_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One gallery candidate as handed to the matcher.
///
/// The descriptor is kept in its stored serialized form so a single
/// corrupt row can be skipped during the scan instead of aborting the
/// whole gallery load.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub identity_id: Uuid,
    pub code: String,
    pub display_name: String,
    /// JSON array of floats as persisted by the template store.
    pub raw_descriptor: String,
}

/// One day's presence event for an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub record_id: Uuid,
    pub identity_id: Uuid,
    /// Local calendar day the record belongs to.
    pub day: NaiveDate,
    pub check_in: DateTime<Utc>,
    pub check_in_evidence: Option<String>,
    pub check_out: Option<DateTime<Utc>>,
    pub check_out_evidence: Option<String>,
    /// Assigned once at check-in; never recomputed at check-out.
    pub status: AttendanceStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl AttendanceRecord {
    /// An open record has a check-in but no check-out yet.
    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }
}
