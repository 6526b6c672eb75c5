//! TraceStore: SQLite-backed persistence for ingested trace entries.
//!
//! Dimension rows (path names, function names, tracepoints) are
//! get-or-create: the first sighting inserts, every later sighting resolves
//! to the same id. Entry rows are append-only and never deduplicated. The
//! whole resolve-then-append unit for one entry runs inside a single
//! exclusive transaction.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use tracehub_wire::TraceEntry;
use tracing::info;

use crate::schema::TRACE_SCHEMA;
use crate::StoreError;

/// Row ids assigned while persisting one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredEntry {
    pub entry_id: i64,
    pub path_id: i64,
    pub function_id: i64,
    pub tracepoint_id: i64,
}

/// Dimension tables subject to get-or-create name resolution.
#[derive(Debug, Clone, Copy)]
enum Dimension {
    Path,
    Function,
}

impl Dimension {
    fn table(self) -> &'static str {
        match self {
            Dimension::Path => "path_name",
            Dimension::Function => "function_name",
        }
    }
}

/// SQLite-backed trace store. Cheap to clone; all clones share one
/// serialized connection.
#[derive(Clone)]
pub struct TraceStore {
    conn: Arc<Mutex<Connection>>,
}

impl TraceStore {
    /// Open a file-backed store, creating the file and schema when absent.
    /// An existing database is opened as-is, with no version check.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let fresh = !path.exists();
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init_connection(&conn).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), fresh, "trace database ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_connection(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        // WAL mode for file-backed databases (no-op for in-memory)
        let _ = conn.execute("PRAGMA journal_mode = WAL", []);
        conn.execute_batch(TRACE_SCHEMA)?;
        Ok(())
    }

    /// Persist one entry: resolve the path, function and tracepoint ids,
    /// then append the entry row. Runs as one exclusive transaction:
    /// either every row lands or none do.
    pub fn record(&self, entry: &TraceEntry) -> Result<StoredEntry, StoreError> {
        let conn = self.conn.lock().unwrap();

        // BEGIN IMMEDIATE acquires the write lock up front
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result = record_inner(&conn, entry);

        match &result {
            Ok(_) => {
                conn.execute("COMMIT", [])?;
            }
            Err(_) => {
                let _ = conn.execute("ROLLBACK", []);
            }
        }

        result
    }

    /// Number of ingested entry rows (for tests and operational spot checks).
    pub fn entry_count(&self) -> Result<u64, StoreError> {
        self.count("trace_entry")
    }

    /// Number of distinct tracepoints sighted so far.
    pub fn tracepoint_count(&self) -> Result<u64, StoreError> {
        self.count("trace_point")
    }

    /// Number of distinct source paths sighted so far.
    pub fn path_count(&self) -> Result<u64, StoreError> {
        self.count("path_name")
    }

    /// Number of distinct function names sighted so far.
    pub fn function_count(&self) -> Result<u64, StoreError> {
        self.count("function_name")
    }

    /// Id of a path name, if it has been sighted.
    pub fn path_id(&self, name: &str) -> Result<Option<i64>, StoreError> {
        self.name_id(Dimension::Path, name)
    }

    /// Id of a function name, if it has been sighted.
    pub fn function_id(&self, name: &str) -> Result<Option<i64>, StoreError> {
        self.name_id(Dimension::Function, name)
    }

    fn count(&self, table: &str) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        Ok(n as u64)
    }

    fn name_id(&self, dim: Dimension, name: &str) -> Result<Option<i64>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let id = conn
            .query_row(
                &format!("SELECT id FROM {} WHERE name = ?1", dim.table()),
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }
}

fn record_inner(conn: &Connection, entry: &TraceEntry) -> Result<StoredEntry, StoreError> {
    let path_id = resolve_name(conn, Dimension::Path, &entry.path)?;
    let function_id = resolve_name(conn, Dimension::Function, &entry.function)?;
    let tracepoint_id = resolve_tracepoint(conn, entry, path_id, function_id)?;

    conn.execute(
        "INSERT INTO trace_entry (pid, tid, timestamp, tracepoint_id, message)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            i64::from(entry.pid),
            i64::from(entry.tid),
            clamp_u64(entry.timestamp),
            tracepoint_id,
            entry.message,
        ],
    )?;

    Ok(StoredEntry {
        entry_id: conn.last_insert_rowid(),
        path_id,
        function_id,
        tracepoint_id,
    })
}

/// Get-or-create a dimension row. The conditional insert rides on the
/// UNIQUE(name) constraint and runs inside the caller's exclusive
/// transaction, so two first-sightings of one name can never both insert.
fn resolve_name(conn: &Connection, dim: Dimension, name: &str) -> Result<i64, StoreError> {
    conn.execute(
        &format!(
            "INSERT INTO {} (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            dim.table()
        ),
        params![name],
    )?;
    let id = conn.query_row(
        &format!("SELECT id FROM {} WHERE name = ?1", dim.table()),
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Get-or-create the tracepoint row for a call-site tuple, keyed on the
/// full (verbosity, type, path, line, function) combination.
fn resolve_tracepoint(
    conn: &Connection,
    entry: &TraceEntry,
    path_id: i64,
    function_id: i64,
) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO trace_point (verbosity, type, path_id, line, function_id)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(verbosity, type, path_id, line, function_id) DO NOTHING",
        params![
            i64::from(entry.verbosity),
            i64::from(entry.kind),
            path_id,
            i64::from(entry.lineno),
            function_id,
        ],
    )?;
    let id = conn.query_row(
        "SELECT id FROM trace_point
         WHERE verbosity = ?1 AND type = ?2 AND path_id = ?3 AND line = ?4 AND function_id = ?5",
        params![
            i64::from(entry.verbosity),
            i64::from(entry.kind),
            path_id,
            i64::from(entry.lineno),
            function_id,
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn clamp_u64(v: u64) -> i64 {
    v.min(i64::MAX as u64) as i64
}
