use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Where the serialized state lives.
pub trait StateStore: Send + Sync {
    /// The stored contents, or `None` when nothing was saved yet.
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, contents: &str) -> Result<()>;
}

/// A JSON file on the local filesystem.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl StateStore for FileStore {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        Ok(Some(contents))
    }

    fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory store for tests. `with_failure()` makes every write fail.
#[cfg(test)]
#[derive(Default, Clone)]
pub struct MemoryStore {
    pub contents: std::sync::Arc<std::sync::Mutex<Option<String>>>,
    should_fail: bool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

#[cfg(test)]
impl StateStore for MemoryStore {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.contents.lock().unwrap().clone())
    }

    fn write(&self, contents: &str) -> Result<()> {
        if self.should_fail {
            anyhow::bail!("Mock failure");
        }
        *self.contents.lock().unwrap() = Some(contents.to_string());
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct StateData {
    /// Start time of the last confirmed pass.
    since: Option<DateTime<Utc>>,
}

/// The sync cutoff carried between runs.
pub struct SyncState {
    store: Box<dyn StateStore>,
    data: StateData,
}

impl SyncState {
    /// Load from `store`. Nothing stored, or corrupt contents, start empty.
    pub fn load(store: Box<dyn StateStore>) -> Result<Self> {
        let data = match store.read()? {
            Some(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(error = %err, "ignoring corrupt state file");
                StateData::default()
            }),
            None => StateData::default(),
        };
        Ok(Self { store, data })
    }

    /// The later of the stored cutoff and `configured`.
    pub fn since(&self, configured: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        match (self.data.since, configured) {
            (Some(stored), Some(configured)) => Some(stored.max(configured)),
            (stored, configured) => stored.or(configured),
        }
    }

    /// Record a confirmed pass that started at `started` and persist it.
    /// The new cutoff is kept in memory even when persisting fails.
    pub fn advance(&mut self, started: DateTime<Utc>) -> Result<()> {
        self.data.since = Some(started);
        let json = serde_json::to_string_pretty(&self.data)?;
        self.store.write(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap()
    }

    fn file_state(path: &Path) -> SyncState {
        SyncState::load(Box::new(FileStore::new(path))).unwrap()
    }

    #[test]
    fn missing_file_uses_configured_since() {
        let dir = tempfile::tempdir().unwrap();
        let state = file_state(&dir.path().join("state.json"));
        assert_eq!(state.since(Some(at(2020))), Some(at(2020)));
        assert_eq!(state.since(None), None);
    }

    #[test]
    fn advance_persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let mut state = file_state(&path);
        state.advance(at(2022)).unwrap();

        let reloaded = file_state(&path);
        assert_eq!(reloaded.since(None), Some(at(2022)));
    }

    #[test]
    fn later_cutoff_wins() {
        let mut state = SyncState::load(Box::new(MemoryStore::default())).unwrap();
        state.advance(at(2022)).unwrap();
        assert_eq!(state.since(Some(at(2020))), Some(at(2022)));
        assert_eq!(state.since(Some(at(2024))), Some(at(2024)));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        let state = file_state(&path);
        assert_eq!(state.since(None), None);
    }

    #[test]
    fn unwritable_file_reports_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut state = file_state(&path);
        std::fs::create_dir(&path).unwrap();
        assert!(state.advance(at(2022)).is_err());
        assert_eq!(state.since(None), Some(at(2022)));
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::default();
        let mut state = SyncState::load(Box::new(store.clone())).unwrap();
        state.advance(at(2023)).unwrap();

        let reloaded = SyncState::load(Box::new(store)).unwrap();
        assert_eq!(reloaded.since(None), Some(at(2023)));
    }
}
