//! Store trait boundary.
//!
//! The engine depends on these abstractions, not on any concrete
//! backend; `rollcall-store` provides the SQLite implementation. All
//! methods return `Send` futures so the traits can be used from a
//! multi-threaded tokio runtime.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::status::AttendanceStatus;
use crate::types::{AttendanceRecord, Descriptor, FaceTemplate, GalleryEntry, Identity};

/// Read access to the external people registry.
pub trait IdentityRegistry: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Look up an active identity by its external code.
    /// Inactive identities are treated as not found.
    fn get_active(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send;
}

/// Persistence for enrolled face templates.
pub trait TemplateStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get_template(
        &self,
        identity_id: Uuid,
    ) -> impl Future<Output = Result<Option<FaceTemplate>, Self::Error>> + Send;

    /// Insert or replace the template for an identity. At most one
    /// template per identity exists; the write is all-or-nothing.
    fn upsert_template(
        &self,
        identity_id: Uuid,
        descriptor: &Descriptor,
        evidence_ref: Option<&str>,
    ) -> impl Future<Output = Result<FaceTemplate, Self::Error>> + Send;

    /// Snapshot the gallery in stable stored order. Descriptors are
    /// returned in their raw serialized form so the matcher can skip a
    /// corrupt row without aborting the scan.
    fn list_gallery(
        &self,
        active_only: bool,
    ) -> impl Future<Output = Result<Vec<GalleryEntry>, Self::Error>> + Send;
}

/// Fields of a new check-in record; the store assigns the record id.
#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub identity_id: Uuid,
    pub day: NaiveDate,
    pub check_in: DateTime<Utc>,
    pub evidence_ref: Option<String>,
    pub status: AttendanceStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Outcome of attempting to insert a check-in.
///
/// The store enforces at most one open record per identity per day; a
/// losing writer in a concurrent race observes `OpenRecordExists`
/// instead of a generic constraint error.
#[derive(Debug)]
pub enum CheckInInsert {
    Created(AttendanceRecord),
    OpenRecordExists,
}

/// Persistence for attendance records.
pub trait AttendanceStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The open (not yet checked-out) record for an identity on a day.
    fn find_open_record(
        &self,
        identity_id: Uuid,
        day: NaiveDate,
    ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send;

    /// A completed (checked-out) record for an identity on a day, if any.
    fn find_completed_record(
        &self,
        identity_id: Uuid,
        day: NaiveDate,
    ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send;

    fn insert_check_in(
        &self,
        new: NewCheckIn,
    ) -> impl Future<Output = Result<CheckInInsert, Self::Error>> + Send;

    /// Fill the check-out fields of an open record. The stored status is
    /// left untouched.
    fn complete_check_out(
        &self,
        record_id: Uuid,
        check_out: DateTime<Utc>,
        evidence_ref: Option<&str>,
        location: Option<&str>,
        notes: Option<&str>,
    ) -> impl Future<Output = Result<AttendanceRecord, Self::Error>> + Send;

    /// All records for an identity with `day` in `[from, to]`, ordered by
    /// day ascending.
    fn list_range(
        &self,
        identity_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send;
}

/// Outcome of storing evidence bytes.
#[derive(Debug, Clone)]
pub struct StoredEvidence {
    pub evidence_ref: String,
    /// False when identical content was already stored: the reference is
    /// shared with an earlier write and must not be deleted when the
    /// operation it was stored for is rolled back.
    pub created: bool,
}

/// Storage for captured evidence images.
pub trait EvidenceStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist an evidence image and return its reference. Partial
    /// writes must not become visible.
    fn store(
        &self,
        bytes: &[u8],
        extension: &str,
    ) -> impl Future<Output = Result<StoredEvidence, Self::Error>> + Send;

    /// Remove previously stored evidence, e.g. when the write it was
    /// meant to document failed. Removing a missing reference is not an
    /// error.
    fn remove(
        &self,
        evidence_ref: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
