//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::state::CrawlState;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for checkpoint backend implementations
///
/// A backend holds at most one live checkpoint per crawl identity. `save`
/// must replace it atomically: a reader sees either the previous snapshot or
/// the new one, never a mix.
pub trait StateStore: Send {
    /// Loads the live checkpoint for `identity`, if any
    ///
    /// # Returns
    ///
    /// * `Ok(Some(state))` - A checkpoint exists and decoded cleanly
    /// * `Ok(None)` - No checkpoint is stored for this identity
    /// * `Err(StorageError)` - A checkpoint exists but cannot be read or decoded
    fn load(&mut self, identity: &str) -> StorageResult<Option<CrawlState>>;

    /// Replaces the live checkpoint for `state.identity`
    fn save(&mut self, state: &CrawlState) -> StorageResult<()>;

    /// Deletes the live checkpoint; a missing checkpoint is not an error
    fn discard(&mut self, identity: &str) -> StorageResult<()>;

    /// Moves the live checkpoint out of the resume path, keeping a copy
    fn archive(&mut self, identity: &str) -> StorageResult<()>;

    /// Short name of the backend, for logging
    fn name(&self) -> &'static str;
}
