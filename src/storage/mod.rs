//! Storage module for persisting crawl checkpoints
//!
//! Two backends implement [`StateStore`]:
//! - `file`: one JSON document per crawl identity, replaced via temp file + rename
//! - `sqlite`: a shared database, each checkpoint replaced in one transaction

mod file;
mod schema;
mod sqlite;
mod traits;

pub use file::FileStateStore;
pub use sqlite::{SqliteStateStore, DATABASE_FILE};
pub use traits::{StateStore, StorageError, StorageResult};

use crate::config::{StateBackend, StateConfig};
use std::path::Path;

/// Opens the backend selected by the `[state]` configuration section
///
/// # Arguments
///
/// * `config` - The `[state]` configuration section
///
/// # Returns
///
/// * `Ok(Box<dyn StateStore>)` - Ready to load and save checkpoints
/// * `Err(StorageError)` - Failed to create the directory or open the database
pub fn open_state_store(config: &StateConfig) -> StorageResult<Box<dyn StateStore>> {
    let root = Path::new(&config.state_dir);

    let store: Box<dyn StateStore> = match config.backend {
        StateBackend::File => Box::new(FileStateStore::new(root)),
        StateBackend::Sqlite => Box::new(SqliteStateStore::new(&root.join(DATABASE_FILE))?),
    };

    tracing::debug!(
        "Opened {} checkpoint store at {}",
        store.name(),
        root.display()
    );
    Ok(store)
}
