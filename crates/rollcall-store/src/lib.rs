//! rollcall-store — SQLite-backed persistence for the attendance engine.
//!
//! Implements the `rollcall-core` store traits over a single SQLite file
//! (via `tokio-rusqlite`), plus a content-addressed filesystem store for
//! evidence images.

mod error;
mod evidence;
mod schema;
mod store;

#[cfg(test)]
mod tests;

pub use error::{Error, Result};
pub use evidence::FsEvidenceStore;
pub use store::SqliteStore;
