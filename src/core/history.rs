//! # Search History
//!
//! The recent-search list shown under an empty search box, plus its
//! persistence.
//!
//! The list is newest-first, unique by trimmed text, and never longer
//! than [`MAX_HISTORY`]. It is stored as one JSON array under
//! [`HISTORY_KEY`] in a [`KeyValueStore`]. The file-backed store keeps
//! one `<key>.json` per key under `~/.geonav/` and writes atomically
//! (write `.tmp`, then `rename()`).

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const MAX_HISTORY: usize = 10;
pub const HISTORY_KEY: &str = "address_search_history";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHistory {
    entries: Vec<HistoryEntry>,
}

impl SearchHistory {
    /// Builds a history from persisted entries, enforcing the size cap and
    /// uniqueness (first occurrence wins, matching newest-first order).
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        let mut history = Self::default();
        for entry in entries {
            if history.entries.len() == MAX_HISTORY {
                break;
            }
            if !history.entries.iter().any(|e| e.text == entry.text) {
                history.entries.push(entry);
            }
        }
        history
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    /// Prepends `text`, dropping any older entry with the same text and
    /// anything past the cap. Blank text is ignored. Returns whether the
    /// list changed.
    pub fn record(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let entry = HistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            created_at: Utc::now().timestamp_millis(),
        };
        self.entries.retain(|e| e.text != text);
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_HISTORY);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ============================================================================
// Key-Value Stores
// ============================================================================

/// String key-value persistence, shaped after browser local storage.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&mut self, key: &str) -> io::Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.geonav/`, created if missing.
    pub fn in_home() -> io::Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?;
        let dir = home.join(".geonav");
        fs::create_dir_all(&dir)?;
        Ok(Self::new(dir))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

/// Atomically write `contents` to `path` (via `.tmp` + rename).
fn atomic_write(path: &Path, contents: &str) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        atomic_write(&self.path_for(key), value)
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Process-local store for tests and `--no-persist` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Loads the persisted history. Missing, unreadable, or malformed data
/// yields an empty history.
pub fn load_history(store: &dyn KeyValueStore) -> SearchHistory {
    let raw = match store.get(HISTORY_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return SearchHistory::default(),
        Err(e) => {
            warn!("Failed to read search history: {}", e);
            return SearchHistory::default();
        }
    };
    match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
        Ok(entries) => {
            let history = SearchHistory::from_entries(entries);
            debug!("Loaded {} search history entries", history.len());
            history
        }
        Err(e) => {
            warn!("Discarding malformed search history: {}", e);
            SearchHistory::default()
        }
    }
}

pub fn save_history(store: &mut dyn KeyValueStore, entries: &[HistoryEntry]) -> io::Result<()> {
    let json = serde_json::to_string(entries)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    store.set(HISTORY_KEY, &json)
}

pub fn clear_history(store: &mut dyn KeyValueStore) -> io::Result<()> {
    store.remove(HISTORY_KEY)
}
