//! Key-value blob storage backing the cache and the persisted roster
//!
//! A `KeyValueStore` is a flat dictionary of string blobs. `FileStore` keeps one
//! JSON file per key in an XDG-compliant data directory; `MemoryStore` keeps
//! everything in a map and is used by tests and when no directory is available.

use directories::ProjectDirs;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

/// Errors raised by a key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem read or write failed
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A previous panic poisoned the in-memory map
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// A persistent dictionary of string blobs
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Returns the blob stored under `key`, or `None` if there is none
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous blob
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes the blob under `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Lists every key currently stored
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Stores each key as `<key>.json` inside a directory
///
/// Keys are percent-encoded into filenames and decoded again by `keys()`.
/// The directory is created on the first write.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a FileStore in the XDG data directory
    ///
    /// Uses `~/.local/share/nuzlocke-navigator/` on Linux, or the platform
    /// equivalent. Returns `None` if no home directory can be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "nuzlocke-navigator")?;
        Some(Self {
            dir: project_dirs.data_dir().to_path_buf(),
        })
    }

    /// Creates a FileStore rooted at a specific directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory holding the blobs
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(key) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(decode_key)
            {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// Maps a key onto a filename stem
///
/// Percent-encoding keeps `[A-Za-z0-9_.~-]` and escapes every other byte, so
/// distinct keys never share a file and the stem decodes back to the key.
fn encode_key(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

/// Recovers the key from a filename stem; `None` for foreign files
fn decode_key(stem: &str) -> Option<String> {
    urlencoding::decode(stem).ok().map(|key| key.into_owned())
}
