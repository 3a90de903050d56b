use crate::config::{config_fingerprint, Config};
use crate::crawler::{CrawlStats, CrawlTask};
use crate::storage::{open_state_store, StateStore};
use crate::TrawlerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Format version of persisted checkpoints
pub const STATE_VERSION: u32 = 1;

/// A persisted snapshot of a crawl in progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlState {
    pub version: u32,

    /// Stable key derived from seed, configuration, and worker slot
    pub identity: String,

    pub config_fingerprint: String,

    pub seed_url: String,

    /// Pending tasks in dispatch order; in-flight tasks at save time come first
    pub frontier: Vec<CrawlTask>,

    /// Hashes of every URL fetched or queued
    pub visited: Vec<String>,

    pub stats: CrawlStats,

    pub saved_at: DateTime<Utc>,
}

/// Derives the checkpoint identity of a crawl
///
/// SHA-256 over the normalized seed, the configuration fingerprint, and the
/// worker slot, truncated to 16 hex characters.
pub fn crawl_identity(
    seed_url: &str,
    fingerprint: &str,
    worker_id: u32,
    total_workers: u32,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed_url.as_bytes());
    hasher.update(b"|");
    hasher.update(fingerprint.as_bytes());
    hasher.update(format!("|{}/{}", worker_id, total_workers).as_bytes());

    let mut identity = hex::encode(hasher.finalize());
    identity.truncate(16);
    identity
}

/// Checkpoint cadence and persistence for one crawl
pub struct StateManager {
    store: Box<dyn StateStore>,
    identity: String,
    fingerprint: String,
    seed_url: String,
    checkpoint_interval: u32,
    completed_since_checkpoint: u32,
    archive_on_complete: bool,
}

impl StateManager {
    /// Opens the configured backend for the crawl of `seed_url`
    ///
    /// # Arguments
    ///
    /// * `config` - The full configuration (fingerprint, worker slot, `[state]`)
    /// * `seed_url` - The normalized seed URL
    pub fn open(config: &Config, seed_url: &str) -> Result<Self, TrawlerError> {
        let store = open_state_store(&config.state)?;
        Ok(Self::with_store(store, config, seed_url))
    }

    /// Creates a manager on top of an existing backend
    pub fn with_store(store: Box<dyn StateStore>, config: &Config, seed_url: &str) -> Self {
        let fingerprint = config_fingerprint(config);
        let identity = crawl_identity(
            seed_url,
            &fingerprint,
            config.distributed.worker_id,
            config.distributed.total_workers,
        );

        Self {
            store,
            identity,
            fingerprint,
            seed_url: seed_url.to_string(),
            checkpoint_interval: config.state.checkpoint_interval.max(1),
            completed_since_checkpoint: 0,
            archive_on_complete: config.state.archive_on_complete,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Loads the checkpoint for this crawl, if one exists
    ///
    /// # Returns
    ///
    /// * `Ok(Some(state))` - A matching snapshot to resume from
    /// * `Ok(None)` - No snapshot stored; start fresh
    /// * `Err(TrawlerError::StateLoad)` - A snapshot exists but is unreadable
    ///   or belongs to a different crawl
    pub fn load(&mut self) -> Result<Option<CrawlState>, TrawlerError> {
        let state = self.store.load(&self.identity).map_err(|e| {
            TrawlerError::StateLoad(format!("checkpoint {} is unreadable: {}", self.identity, e))
        })?;

        let Some(state) = state else {
            return Ok(None);
        };

        if state.version != STATE_VERSION {
            return Err(TrawlerError::StateLoad(format!(
                "checkpoint {} has version {}, expected {}",
                self.identity, state.version, STATE_VERSION
            )));
        }

        if state.config_fingerprint != self.fingerprint || state.seed_url != self.seed_url {
            return Err(TrawlerError::StateLoad(format!(
                "checkpoint {} was written for a different crawl configuration",
                self.identity
            )));
        }

        Ok(Some(state))
    }

    /// Counts a completed page; returns true when a checkpoint is due
    pub fn record_completion(&mut self) -> bool {
        self.completed_since_checkpoint += 1;
        self.completed_since_checkpoint >= self.checkpoint_interval
    }

    /// Atomically replaces the stored snapshot
    pub fn checkpoint(
        &mut self,
        frontier: Vec<CrawlTask>,
        visited: Vec<String>,
        stats: &CrawlStats,
    ) -> Result<(), TrawlerError> {
        let state = CrawlState {
            version: STATE_VERSION,
            identity: self.identity.clone(),
            config_fingerprint: self.fingerprint.clone(),
            seed_url: self.seed_url.clone(),
            frontier,
            visited,
            stats: stats.clone(),
            saved_at: Utc::now(),
        };

        self.store.save(&state)?;
        self.completed_since_checkpoint = 0;

        tracing::debug!(
            "Checkpoint {} saved ({} queued, {} visited)",
            self.identity,
            state.frontier.len(),
            state.visited.len()
        );
        Ok(())
    }

    /// Disposes of the snapshot after a crawl that drained its frontier
    ///
    /// The snapshot is archived when `archive-on-complete` is set and deleted
    /// otherwise.
    pub fn complete(&mut self) -> Result<(), TrawlerError> {
        if self.archive_on_complete {
            self.store.archive(&self.identity)?;
        } else {
            self.store.discard(&self.identity)?;
            tracing::debug!("Checkpoint {} discarded", self.identity);
        }
        Ok(())
    }

    /// Removes any stored snapshot so the next run starts fresh
    pub fn reset(&mut self) -> Result<(), TrawlerError> {
        self.store.discard(&self.identity)?;
        Ok(())
    }
}
