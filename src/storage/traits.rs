//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{Edge, EdgeKind, EdgeRecord, RunRecord, RunStatus, WriteSet};
use rusqlite::ErrorCode;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Unknown edge kind in database: {0}")]
    UnknownEdgeKind(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// Returns true for lock and busy conflicts that a later attempt may not hit
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            }
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every write is insert-if-absent on its key: repeating a write with the same
/// key leaves the store unchanged and is not an error. Implementations are
/// used from one task at a time; concurrent workers each hold their own
/// instance.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Adds one finished round and its article count to a run
    fn record_round(&mut self, run_id: i64, articles: u64) -> StorageResult<()>;

    /// Sets a final status and finish timestamp on a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Graph Writes =====

    /// Inserts an edge unless the `(from, to)` pair already exists
    ///
    /// Returns true if a row was written.
    fn upsert_edge(&mut self, edge: &Edge) -> StorageResult<bool>;

    /// Inserts an equivalence record unless one exists for `id`
    fn upsert_equivalence(&mut self, id: &str, members: &[String]) -> StorageResult<bool>;

    /// Inserts article text unless text exists for `id`
    fn upsert_text(&mut self, id: &str, text: &str) -> StorageResult<bool>;

    /// Deletes every edge pointing at `id` and returns how many were removed
    fn purge_inbound(&mut self, id: &str) -> StorageResult<usize>;

    /// Applies a unit of work atomically
    ///
    /// Either every write in `writes` is applied (each with insert-if-absent
    /// semantics) or none is.
    fn commit(&mut self, writes: &WriteSet) -> StorageResult<()>;

    // ===== Graph Reads =====

    /// Gets the equivalence record for `id`
    fn get_equivalence(&self, id: &str) -> StorageResult<Option<Vec<String>>>;

    /// Returns true if a text record exists for `id`
    fn has_text(&self, id: &str) -> StorageResult<bool>;

    /// Gets the stored text for `id`
    fn get_text(&self, id: &str) -> StorageResult<Option<String>>;

    /// Returns up to `limit` unvisited targets, oldest discovered first
    ///
    /// A target qualifies when it is the target of a see-also, in-text or lang
    /// edge and has no text record. Each target appears at most once.
    fn next_frontier_batch(&self, limit: usize) -> StorageResult<Vec<String>>;

    /// Gets all edges leaving `id`
    fn get_outgoing_edges(&self, id: &str) -> StorageResult<Vec<EdgeRecord>>;

    /// Gets all edges pointing at `id`
    fn get_incoming_edges(&self, id: &str) -> StorageResult<Vec<EdgeRecord>>;

    // ===== Statistics =====

    /// Counts edges grouped by kind
    fn count_edges_by_kind(&self) -> StorageResult<HashMap<EdgeKind, u64>>;

    /// Counts stored article texts
    fn count_texts(&self) -> StorageResult<u64>;

    /// Counts equivalence records
    fn count_equivalences(&self) -> StorageResult<u64>;

    /// Counts distinct unvisited frontier targets
    fn count_frontier(&self) -> StorageResult<u64>;
}
