//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Wikiweave database.

/// Edge kinds whose targets make up the crawl frontier, as stored
pub const FRONTIER_KINDS: &str = "('seealso', 'intext', 'lang')";

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    rounds INTEGER NOT NULL DEFAULT 0,
    articles INTEGER NOT NULL DEFAULT 0
);

-- Directed typed edges; seq preserves discovery order
CREATE TABLE IF NOT EXISTS edges (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    from_id TEXT NOT NULL,
    to_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    UNIQUE(from_id, to_id)
);

CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_id);
CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_id);

-- Cross-language equivalence records (JSON array of identifiers)
CREATE TABLE IF NOT EXISTS equivalences (
    id TEXT PRIMARY KEY,
    members TEXT NOT NULL
);

-- Raw article source, one per canonical identifier
CREATE TABLE IF NOT EXISTS texts (
    id TEXT PRIMARY KEY,
    body TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
