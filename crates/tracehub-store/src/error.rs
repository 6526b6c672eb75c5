use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file could not be opened or its schema could not be
    /// created. Fatal at startup.
    #[error("failed to open trace database at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A statement or transaction failed mid-ingest. The enclosing
    /// transaction is rolled back and the offending entry dropped;
    /// ingestion continues.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}
