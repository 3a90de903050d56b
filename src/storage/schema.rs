//! Database schema definitions for the SQLite checkpoint backend

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One live checkpoint per crawl identity
CREATE TABLE IF NOT EXISTS checkpoints (
    identity TEXT PRIMARY KEY,
    version INTEGER NOT NULL,
    config_fingerprint TEXT NOT NULL,
    seed_url TEXT NOT NULL,
    stats TEXT NOT NULL,
    saved_at TEXT NOT NULL
);

-- Pending tasks in dispatch order
CREATE TABLE IF NOT EXISTS frontier (
    identity TEXT NOT NULL REFERENCES checkpoints(identity) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    url TEXT NOT NULL,
    hash TEXT NOT NULL,
    domain TEXT NOT NULL,
    depth INTEGER NOT NULL,
    parent_url TEXT,
    discovered_at TEXT NOT NULL,
    PRIMARY KEY (identity, position)
);

-- Hashes already fetched or queued
CREATE TABLE IF NOT EXISTS visited (
    identity TEXT NOT NULL REFERENCES checkpoints(identity) ON DELETE CASCADE,
    hash TEXT NOT NULL,
    PRIMARY KEY (identity, hash)
);

-- Completed crawls kept for inspection
CREATE TABLE IF NOT EXISTS archived_checkpoints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identity TEXT NOT NULL,
    archived_at TEXT NOT NULL,
    state TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_archived_identity ON archived_checkpoints(identity);
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
