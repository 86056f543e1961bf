//! rollcall-core — Identity resolution and attendance primitives.
//!
//! Pure building blocks for the attendance engine: the face descriptor
//! type and comparator, multi-sample template averaging, the check-in
//! status rule and effective-status calendar derivation, and the store
//! trait boundary implemented by `rollcall-store`.

pub mod compare;
pub mod enroll;
pub mod status;
pub mod store;
pub mod types;

pub use compare::{compare, CompareError, Comparison, Metric};
pub use status::AttendanceStatus;
pub use types::{AttendanceRecord, Descriptor, FaceTemplate, GalleryEntry, Identity};
