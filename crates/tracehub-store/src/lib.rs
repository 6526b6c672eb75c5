//! Normalized SQLite storage for trace entries.
//!
//! Incoming [`tracehub_wire::TraceEntry`] values are decomposed into
//! deduplicated dimension rows (path names, function names, tracepoints)
//! plus one append-only `trace_entry` row, all within a single exclusive
//! transaction.

mod error;
pub mod schema;
mod store;

pub use error::StoreError;
pub use store::{StoredEntry, TraceStore};
