//! TCP ingestion server for instrumented-process trace events.
//!
//! The listener accepts any number of client connections; each connection
//! gets its own handler task that reads length-framed XML messages,
//! deserializes them, persists them through the shared
//! [`tracehub_store::TraceStore`], and publishes every stored entry to
//! in-process subscribers (a live viewer, typically).

pub mod config;
mod connection;
mod error;
mod notifier;
mod server;

pub use config::ServerConfig;
pub use error::ServerError;
pub use notifier::{EntryNotifier, StoredTraceEntry};
pub use server::Server;
