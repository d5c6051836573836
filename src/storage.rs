//! Persistence of a tab's selections.
//!
//! Selections are stored as an [`ExportDocument`] under a key namespaced by
//! tab (`page_<tab>`). Absent data is not an error: `get` returns `None` and
//! callers treat it as "no selections".

use crate::error::Result;
use crate::selection::ExportDocument;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default directory of the file store
pub const DEFAULT_STORE_DIR: &str = ".scrape-picker";

/// Storage key of a tab
pub fn tab_key(tab: &str) -> String {
    format!("page_{}", tab)
}

/// Key-value persistence for per-tab selections
pub trait Storage: Send + Sync {
    /// Store the document under `key`, replacing any previous value
    fn put(&self, key: &str, document: &ExportDocument) -> Result<()>;

    /// Load the document stored under `key`
    fn get(&self, key: &str) -> Result<Option<ExportDocument>>;

    /// Delete the document stored under `key`, if any
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, ExportDocument>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, ExportDocument>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn put(&self, key: &str, document: &ExportDocument) -> Result<()> {
        self.entries().insert(key.to_string(), document.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<ExportDocument>> {
        Ok(self.entries().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Options for the file store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageOptions {
    /// Directory holding one JSON file per key
    pub dir: PathBuf,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }
}

impl StorageOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Storage keeping one pretty-printed JSON file per key
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open a store rooted at `options.dir`; the directory is created lazily
    pub fn new(options: StorageOptions) -> Self {
        Self { dir: options.dir }
    }

    /// Directory of the store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl Storage for FileStorage {
    fn put(&self, key: &str, document: &ExportDocument) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        std::fs::write(&path, serde_json::to_string_pretty(document)?)?;
        log::debug!("Stored {} selections at {}", document.selections.len(), path.display());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<ExportDocument>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
