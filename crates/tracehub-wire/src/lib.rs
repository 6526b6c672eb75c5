//! Wire format shared between instrumented clients and the ingestion server.
//!
//! A client sends one length-prefixed frame per trace event; the frame
//! payload is a small XML document carrying the event fields. This crate is
//! pure: it decodes buffers into [`TraceEntry`] values and never touches a
//! socket.

mod entry;
mod error;
pub mod frame;
mod xml;

pub use entry::TraceEntry;
pub use error::WireError;
pub use xml::deserialize_entry;
