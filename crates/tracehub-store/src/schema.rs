//! SQLite schema for normalized trace storage.
//!
//! Tables:
//! - `path_name`, `function_name`: deduplicated dimension tables
//! - `trace_point`: one row per distinct call-site/verbosity/type tuple
//! - `trace_entry`: append-only ingested events
//! - `variable_value`, `backtrace`: reserved extension tables, present for
//!   schema compatibility but not written by the ingestion path

/// DDL for the trace database. The layout is fixed by existing consumers
/// and must be reproduced exactly.
pub const TRACE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS trace_entry (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    pid           INTEGER,
    tid           INTEGER,
    timestamp     DATETIME,
    tracepoint_id INTEGER,
    message       TEXT
);

CREATE TABLE IF NOT EXISTS trace_point (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    verbosity   INTEGER,
    type        INTEGER,
    path_id     INTEGER,
    line        INTEGER,
    function_id INTEGER,
    UNIQUE(verbosity, type, path_id, line, function_id)
);

CREATE TABLE IF NOT EXISTS function_name (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    UNIQUE(name)
);

CREATE TABLE IF NOT EXISTS path_name (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    UNIQUE(name)
);

CREATE TABLE IF NOT EXISTS variable_value (
    tracepoint_id INTEGER,
    name          TEXT,
    value         TEXT,
    UNIQUE(tracepoint_id, name)
);

CREATE TABLE IF NOT EXISTS backtrace (
    tracepoint_id INTEGER,
    line          INTEGER,
    text          TEXT
);
"#;
