//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::{initialize_schema, FRONTIER_KINDS};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{Edge, EdgeKind, EdgeRecord, RunRecord, RunStatus, WriteSet};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Busy timeout used when none is configured
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

const INSERT_EDGE_SQL: &str =
    "INSERT OR IGNORE INTO edges (from_id, to_id, kind) VALUES (?1, ?2, ?3)";
const INSERT_EQUIVALENCE_SQL: &str =
    "INSERT OR IGNORE INTO equivalences (id, members) VALUES (?1, ?2)";
const INSERT_TEXT_SQL: &str = "INSERT OR IGNORE INTO texts (id, body) VALUES (?1, ?2)";

/// SQLite storage backend
///
/// One instance wraps one connection. Workers open their own instance against
/// the same database file; WAL mode lets readers proceed while one writer
/// commits.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the database and bootstraps the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        Self::bootstrap(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Opens the database with the given busy timeout and bootstraps the schema
    pub fn bootstrap(path: &Path, busy_timeout: Duration) -> StorageResult<Self> {
        let storage = Self::open(path, busy_timeout)?;
        initialize_schema(&storage.conn)?;
        Ok(storage)
    }

    /// Opens a connection to an already-bootstrapped database
    pub fn open(path: &Path, busy_timeout: Duration) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_edges(&self, sql: &str, id: &str) -> StorageResult<Vec<EdgeRecord>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params![id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(seq, from_id, to_id, kind)| {
                let kind = EdgeKind::from_db_string(&kind)
                    .ok_or(StorageError::UnknownEdgeKind(kind))?;
                Ok(EdgeRecord {
                    seq,
                    from_id,
                    to_id,
                    kind,
                })
            })
            .collect()
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn read_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Failed),
        rounds: row.get::<_, i64>(5)? as u64,
        articles: row.get::<_, i64>(6)? as u64,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, rounds, articles
                 FROM runs WHERE id = ?1",
                params![run_id],
                read_run,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, rounds, articles
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                read_run,
            )
            .optional()?;
        Ok(run)
    }

    fn record_round(&mut self, run_id: i64, articles: u64) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET rounds = rounds + 1, articles = articles + ?1 WHERE id = ?2",
            params![articles as i64, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Graph Writes =====

    fn upsert_edge(&mut self, edge: &Edge) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            INSERT_EDGE_SQL,
            params![edge.from_id, edge.to_id, edge.kind.to_db_string()],
        )?;
        Ok(inserted > 0)
    }

    fn upsert_equivalence(&mut self, id: &str, members: &[String]) -> StorageResult<bool> {
        let encoded = serde_json::to_string(members)?;
        let inserted = self
            .conn
            .execute(INSERT_EQUIVALENCE_SQL, params![id, encoded])?;
        Ok(inserted > 0)
    }

    fn upsert_text(&mut self, id: &str, text: &str) -> StorageResult<bool> {
        let inserted = self.conn.execute(INSERT_TEXT_SQL, params![id, text])?;
        Ok(inserted > 0)
    }

    fn purge_inbound(&mut self, id: &str) -> StorageResult<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM edges WHERE to_id = ?1", params![id])?;
        Ok(deleted)
    }

    fn commit(&mut self, writes: &WriteSet) -> StorageResult<()> {
        // Take the write lock up front so a busy database fails here rather
        // than halfway through the unit of work.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare_cached(INSERT_EQUIVALENCE_SQL)?;
            for (id, members) in writes.equivalences() {
                stmt.execute(params![id, serde_json::to_string(members)?])?;
            }

            let mut stmt = tx.prepare_cached(INSERT_EDGE_SQL)?;
            for edge in writes.edges() {
                stmt.execute(params![edge.from_id, edge.to_id, edge.kind.to_db_string()])?;
            }

            let mut stmt = tx.prepare_cached(INSERT_TEXT_SQL)?;
            for (id, text) in writes.texts() {
                stmt.execute(params![id, text])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ===== Graph Reads =====

    fn get_equivalence(&self, id: &str) -> StorageResult<Option<Vec<String>>> {
        let encoded: Option<String> = self
            .conn
            .query_row(
                "SELECT members FROM equivalences WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match encoded {
            Some(encoded) => Ok(Some(serde_json::from_str(&encoded)?)),
            None => Ok(None),
        }
    }

    fn has_text(&self, id: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM texts WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn get_text(&self, id: &str) -> StorageResult<Option<String>> {
        let text = self
            .conn
            .query_row("SELECT body FROM texts WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(text)
    }

    fn next_frontier_batch(&self, limit: usize) -> StorageResult<Vec<String>> {
        let sql = format!(
            "SELECT e.to_id FROM edges e
             WHERE e.kind IN {FRONTIER_KINDS}
               AND NOT EXISTS (SELECT 1 FROM texts t WHERE t.id = e.to_id)
             GROUP BY e.to_id
             ORDER BY MIN(e.seq)
             LIMIT ?1"
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let batch = stmt
            .query_map(params![limit as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(batch)
    }

    fn get_outgoing_edges(&self, id: &str) -> StorageResult<Vec<EdgeRecord>> {
        self.query_edges(
            "SELECT seq, from_id, to_id, kind FROM edges WHERE from_id = ?1 ORDER BY seq",
            id,
        )
    }

    fn get_incoming_edges(&self, id: &str) -> StorageResult<Vec<EdgeRecord>> {
        self.query_edges(
            "SELECT seq, from_id, to_id, kind FROM edges WHERE to_id = ?1 ORDER BY seq",
            id,
        )
    }

    // ===== Statistics =====

    fn count_edges_by_kind(&self) -> StorageResult<HashMap<EdgeKind, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM edges GROUP BY kind")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = HashMap::new();
        for (kind, count) in rows {
            let kind =
                EdgeKind::from_db_string(&kind).ok_or(StorageError::UnknownEdgeKind(kind))?;
            counts.insert(kind, count as u64);
        }
        Ok(counts)
    }

    fn count_texts(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM texts")
    }

    fn count_equivalences(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM equivalences")
    }

    fn count_frontier(&self) -> StorageResult<u64> {
        self.count(&format!(
            "SELECT COUNT(DISTINCT e.to_id) FROM edges e
             WHERE e.kind IN {FRONTIER_KINDS}
               AND NOT EXISTS (SELECT 1 FROM texts t WHERE t.id = e.to_id)"
        ))
    }
}
