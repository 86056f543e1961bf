//! Error taxonomy of the attendance engine.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::extract::ExtractError;
use rollcall_core::compare::CompareError;

/// All failures an engine operation can report.
///
/// Resolution misses (`FaceNotRecognized`) and state conflicts
/// (`AlreadyCheckedIn`, `NotCheckedIn`) are expected outcomes that
/// callers translate into user-facing rejections; `Store` and
/// `Evidence` are retryable infrastructure failures.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("identity not found or inactive: {0}")]
    IdentityNotFound(String),

    #[error("at least {required} capture samples required, got {received}")]
    NotEnoughSamples { received: usize, required: usize },

    #[error("enrollment failed: no usable face found in any of the {images_received} supplied images")]
    EnrollmentFailed { images_received: usize },

    #[error(
        "face not recognized: closest gallery similarity {highest_similarity:.2} \
         is below threshold {threshold:.2}"
    )]
    FaceNotRecognized {
        highest_similarity: f32,
        threshold: f32,
    },

    #[error("already checked in today (at {since})")]
    AlreadyCheckedIn { since: DateTime<Utc> },

    #[error("no open check-in found for today")]
    NotCheckedIn,

    #[error("check-out time {check_out} is not after check-in time {check_in}")]
    CheckOutNotAfterCheckIn {
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("identity {0} has no enrolled face template")]
    IdentityHasNoTemplate(String),

    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("comparison error: {0}")]
    Compare(#[from] CompareError),

    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("evidence storage error: {0}")]
    Evidence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
    pub(crate) fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
        Self::Store(Box::new(e))
    }

    pub(crate) fn evidence<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
        Self::Evidence(Box::new(e))
    }
}
