//! rollcall-engine — biometric identity resolution and attendance.
//!
//! Ties the pure primitives of `rollcall-core` to a store backend:
//! embedding extraction boundary, bounded-time gallery matching,
//! multi-sample enrollment, the check-in/check-out state machine and
//! calendar-range status derivation.

pub mod config;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod report;
pub mod service;

pub use config::EngineConfig;
pub use error::EngineError;
pub use extract::{decode_image, EmbeddingExtractor, ExtractError, NoLocalExtractor};
pub use matcher::{find_best, MatchConfig, MatchOutcome};
pub use report::{month_statuses, range_statuses, tally, DayStatus, RecapTally};
pub use service::{
    CheckInReceipt, CheckOutReceipt, Engine, EnrollmentSummary, IdentityRef, Verification,
};
