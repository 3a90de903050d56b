//! SQLite checkpoint backend
//!
//! All identities share `{state_dir}/state.db`. A checkpoint is replaced
//! inside a single transaction, so a crash mid-save leaves the previous
//! snapshot intact.

use crate::crawler::{CrawlStats, CrawlTask};
use crate::state::CrawlState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StateStore, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Database file name inside the state directory
pub const DATABASE_FILE: &str = "state.db";

/// SQLite checkpoint backend
pub struct SqliteStateStore {
    conn: Connection,
}

impl SqliteStateStore {
    /// Opens or creates the checkpoint database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStateStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Number of archived checkpoints for `identity`
    pub fn archived_count(&self, identity: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM archived_checkpoints WHERE identity = ?1",
            params![identity],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn load_frontier(&self, identity: &str) -> StorageResult<Vec<CrawlTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, hash, domain, depth, parent_url, discovered_at
             FROM frontier WHERE identity = ?1 ORDER BY position",
        )?;

        let rows = stmt.query_map(params![identity], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut frontier = Vec::new();
        for row in rows {
            let (url, hash, domain, depth, parent_url, discovered_at) = row?;
            frontier.push(CrawlTask {
                url,
                hash,
                domain,
                depth,
                parent_url,
                discovered_at: parse_timestamp(&discovered_at)?,
            });
        }
        Ok(frontier)
    }

    fn load_visited(&self, identity: &str) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT hash FROM visited WHERE identity = ?1 ORDER BY hash")?;
        let hashes = stmt
            .query_map(params![identity], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(hashes)
    }
}

impl StateStore for SqliteStateStore {
    fn load(&mut self, identity: &str) -> StorageResult<Option<CrawlState>> {
        let header = self
            .conn
            .query_row(
                "SELECT version, config_fingerprint, seed_url, stats, saved_at
                 FROM checkpoints WHERE identity = ?1",
                params![identity],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((version, config_fingerprint, seed_url, stats, saved_at)) = header else {
            return Ok(None);
        };

        let stats: CrawlStats = serde_json::from_str(&stats)?;

        Ok(Some(CrawlState {
            version,
            identity: identity.to_string(),
            config_fingerprint,
            seed_url,
            frontier: self.load_frontier(identity)?,
            visited: self.load_visited(identity)?,
            stats,
            saved_at: parse_timestamp(&saved_at)?,
        }))
    }

    fn save(&mut self, state: &CrawlState) -> StorageResult<()> {
        let stats = serde_json::to_string(&state.stats)?;
        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM checkpoints WHERE identity = ?1",
            params![state.identity],
        )?;
        tx.execute(
            "INSERT INTO checkpoints (identity, version, config_fingerprint, seed_url, stats, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                state.identity,
                state.version,
                state.config_fingerprint,
                state.seed_url,
                stats,
                state.saved_at.to_rfc3339(),
            ],
        )?;

        {
            let mut insert_task = tx.prepare(
                "INSERT INTO frontier (identity, position, url, hash, domain, depth, parent_url, discovered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (position, task) in state.frontier.iter().enumerate() {
                insert_task.execute(params![
                    state.identity,
                    position as i64,
                    task.url,
                    task.hash,
                    task.domain,
                    task.depth,
                    task.parent_url,
                    task.discovered_at.to_rfc3339(),
                ])?;
            }

            let mut insert_hash =
                tx.prepare("INSERT OR IGNORE INTO visited (identity, hash) VALUES (?1, ?2)")?;
            for hash in &state.visited {
                insert_hash.execute(params![state.identity, hash])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn discard(&mut self, identity: &str) -> StorageResult<()> {
        self.conn.execute(
            "DELETE FROM checkpoints WHERE identity = ?1",
            params![identity],
        )?;
        Ok(())
    }

    fn archive(&mut self, identity: &str) -> StorageResult<()> {
        let Some(state) = self.load(identity)? else {
            return Ok(());
        };
        let encoded = serde_json::to_string(&state)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO archived_checkpoints (identity, archived_at, state) VALUES (?1, ?2, ?3)",
            params![identity, Utc::now().to_rfc3339(), encoded],
        )?;
        tx.execute(
            "DELETE FROM checkpoints WHERE identity = ?1",
            params![identity],
        )?;
        tx.commit()?;

        tracing::info!("Checkpoint {} archived", identity);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Database(format!("Invalid timestamp '{}': {}", value, e)))
}
