//! JSON file checkpoint backend
//!
//! Layout under the state directory:
//!
//! ```text
//! {state_dir}/{identity}/checkpoint.json
//! {state_dir}/archive/{identity}-{timestamp}.json
//! ```

use crate::state::CrawlState;
use crate::storage::traits::{StateStore, StorageResult};
use chrono::Utc;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const CHECKPOINT_FILE: &str = "checkpoint.json";
const ARCHIVE_DIR: &str = "archive";

/// Stores each checkpoint as one JSON document, replaced by rename
pub struct FileStateStore {
    root: PathBuf,
}

impl FileStateStore {
    /// Creates a store rooted at `root`; directories are created on first save
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the live checkpoint for `identity`
    pub fn checkpoint_path(&self, identity: &str) -> PathBuf {
        self.root.join(identity).join(CHECKPOINT_FILE)
    }

    /// Directory archived checkpoints are moved to
    pub fn archive_dir(&self) -> PathBuf {
        self.root.join(ARCHIVE_DIR)
    }
}

impl StateStore for FileStateStore {
    fn load(&mut self, identity: &str) -> StorageResult<Option<CrawlState>> {
        let path = self.checkpoint_path(identity);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state: CrawlState = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    fn save(&mut self, state: &CrawlState) -> StorageResult<()> {
        let path = self.checkpoint_path(&state.identity);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let encoded = serde_json::to_vec(state)?;
        write_atomically(&path, &encoded)?;

        tracing::debug!("Checkpoint written to {}", path.display());
        Ok(())
    }

    fn discard(&mut self, identity: &str) -> StorageResult<()> {
        let dir = self.root.join(identity);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn archive(&mut self, identity: &str) -> StorageResult<()> {
        let path = self.checkpoint_path(identity);
        if !path.exists() {
            return Ok(());
        }

        let archive_dir = self.archive_dir();
        fs::create_dir_all(&archive_dir)?;

        let target = archive_dir.join(format!(
            "{}-{}.json",
            identity,
            Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
        ));
        fs::rename(&path, &target)?;
        self.discard(identity)?;

        tracing::info!("Checkpoint archived to {}", target.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Writes `data` to a sibling temp file, syncs it, then renames over `path`
fn write_atomically(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)
}
