//! Filter stores

use super::SessionKey;
use crate::model::FilterSet;
use crate::{Result, ScrumboardError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Saved filter state per user and provider
pub trait FilterStore: Send + Sync {
    /// Saved filters, empty when nothing was stored yet
    fn load(&self, key: &SessionKey) -> Result<FilterSet>;

    /// Replace the saved filters
    fn save(&self, key: &SessionKey, filters: &FilterSet) -> Result<()>;

    fn clear(&self, key: &SessionKey) -> Result<()>;
}

/// In-process store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryFilterStore {
    entries: Mutex<HashMap<SessionKey, FilterSet>>,
}

impl MemoryFilterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<SessionKey, FilterSet>>> {
        self.entries
            .lock()
            .map_err(|_| ScrumboardError::Session("filter store lock poisoned".to_string()))
    }
}

impl FilterStore for MemoryFilterStore {
    fn load(&self, key: &SessionKey) -> Result<FilterSet> {
        Ok(self.lock()?.get(key).cloned().unwrap_or_default())
    }

    fn save(&self, key: &SessionKey, filters: &FilterSet) -> Result<()> {
        self.lock()?.insert(key.clone(), filters.persisted());
        Ok(())
    }

    fn clear(&self, key: &SessionKey) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// One stored entry of the filter file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredFilters {
    /// Format version (for backwards compatibility)
    #[serde(default = "default_version")]
    version: u32,
    login: String,
    provider_id: String,
    #[serde(default)]
    filters: FilterSet,
    /// RFC 3339 timestamp of the last write
    #[serde(default)]
    updated_at: Option<String>,
}

fn default_version() -> u32 {
    1
}

/// JSON file store shared by all users of the machine.
///
/// The whole file is rewritten on every save; the last writer wins.
#[derive(Debug)]
pub struct FileFilterStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileFilterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Vec<StoredFilters>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let entries: Vec<StoredFilters> = serde_json::from_str(&content).map_err(|e| {
            ScrumboardError::Session(format!(
                "Invalid filter store {}: {}",
                self.path.display(),
                e
            ))
        })?;
        for entry in entries.iter().filter(|e| e.version != 1) {
            warn!(
                version = entry.version,
                login = %entry.login,
                "Unknown filter entry version, reading anyway"
            );
        }
        Ok(entries)
    }

    fn write_entries(&self, entries: &[StoredFilters]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), entries = entries.len(), "Wrote filter store");
        Ok(())
    }

    fn update<F>(&self, key: &SessionKey, change: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<StoredFilters>),
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| ScrumboardError::Session("filter store lock poisoned".to_string()))?;
        let mut entries = self.read_entries()?;
        entries.retain(|e| !key.matches(&e.login, &e.provider_id));
        change(&mut entries);
        self.write_entries(&entries)
    }
}

impl FilterStore for FileFilterStore {
    fn load(&self, key: &SessionKey) -> Result<FilterSet> {
        Ok(self
            .read_entries()?
            .into_iter()
            .find(|e| key.matches(&e.login, &e.provider_id))
            .map(|e| e.filters)
            .unwrap_or_default())
    }

    fn save(&self, key: &SessionKey, filters: &FilterSet) -> Result<()> {
        let entry = StoredFilters {
            version: default_version(),
            login: key.login.clone(),
            provider_id: key.provider_id.clone(),
            filters: filters.persisted(),
            updated_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        self.update(key, |entries| entries.push(entry))
    }

    fn clear(&self, key: &SessionKey) -> Result<()> {
        self.update(key, |_| {})
    }
}
