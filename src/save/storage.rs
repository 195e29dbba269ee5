//! Where save blobs live.
//!
//! Native builds write one JSON file per key into a saves directory. Browser
//! builds write into `localStorage` under a fixed prefix. Tests use the
//! in-memory store.

use bevy::prelude::*;
use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

use super::coordinator::SaveError;
use crate::config::GameConfig;

pub trait SaveStorage: Send + Sync + 'static {
    fn read(&self, key: &str) -> Result<Option<String>, SaveError>;
    fn write(&mut self, key: &str, contents: &str) -> Result<(), SaveError>;
    fn remove(&mut self, key: &str) -> Result<(), SaveError>;
}

/// The storage backend the save coordinator writes through.
#[derive(Resource)]
pub struct SaveBackend(Box<dyn SaveStorage>);

impl SaveBackend {
    pub fn new(storage: impl SaveStorage) -> Self {
        Self(Box::new(storage))
    }

    pub fn memory() -> Self {
        Self::new(MemoryStorage::default())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_config(config: &GameConfig) -> Self {
        let dir = config.saves_dir.clone().unwrap_or_else(default_saves_directory);
        Self::new(FileStorage::new(dir))
    }

    #[cfg(target_arch = "wasm32")]
    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(LocalStorage::new(config.storage_key_prefix.clone()))
    }

    pub fn read(&self, key: &str) -> Result<Option<String>, SaveError> {
        self.0.read(key)
    }

    pub fn write(&mut self, key: &str, contents: &str) -> Result<(), SaveError> {
        self.0.write(key, contents)
    }

    pub fn remove(&mut self, key: &str) -> Result<(), SaveError> {
        self.0.remove(key)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// IN-MEMORY
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blobs: HashMap<String, String>,
}

impl SaveStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SaveError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<(), SaveError> {
        self.blobs.insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SaveError> {
        self.blobs.remove(key);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// FILESYSTEM
// ═══════════════════════════════════════════════════════════════════════

#[cfg(not(target_arch = "wasm32"))]
fn default_saves_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    exe_dir.join("saves")
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl SaveStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SaveError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).map_err(|source| SaveError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Some(contents))
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<(), SaveError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|source| SaveError::Io {
                path: self.dir.display().to_string(),
                source,
            })?;
        }
        let path = self.path_for(key);
        // Write to a temp file first, then rename for atomicity
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).map_err(|source| SaveError::Io {
            path: tmp_path.display().to_string(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| SaveError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), SaveError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(&path).map_err(|source| SaveError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// BROWSER localStorage
// ═══════════════════════════════════════════════════════════════════════

#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone)]
pub struct LocalStorage {
    prefix: String,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn storage(&self) -> Result<web_sys::Storage, SaveError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or_else(|| SaveError::Backend("localStorage unavailable".to_string()))
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[cfg(target_arch = "wasm32")]
impl SaveStorage for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SaveError> {
        self.storage()?
            .get_item(&self.full_key(key))
            .map_err(|e| SaveError::Backend(format!("{:?}", e)))
    }

    fn write(&mut self, key: &str, contents: &str) -> Result<(), SaveError> {
        self.storage()?
            .set_item(&self.full_key(key), contents)
            .map_err(|e| SaveError::Backend(format!("{:?}", e)))
    }

    fn remove(&mut self, key: &str) -> Result<(), SaveError> {
        self.storage()?
            .remove_item(&self.full_key(key))
            .map_err(|e| SaveError::Backend(format!("{:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_round_trip_and_remove() {
        let mut storage = MemoryStorage::default();
        assert_eq!(storage.read("slot_0").unwrap(), None);
        storage.write("slot_0", "{}").unwrap();
        assert_eq!(storage.read("slot_0").unwrap().as_deref(), Some("{}"));
        storage.remove("slot_0").unwrap();
        assert_eq!(storage.read("slot_0").unwrap(), None);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_file_storage_creates_directory_and_leaves_no_temp_file() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("saves");
        let mut storage = FileStorage::new(&dir);

        storage.write("slot_1", "{\"version\":1}").unwrap();
        assert!(dir.join("slot_1.json").exists());
        assert!(!dir.join("slot_1.json.tmp").exists());
        assert_eq!(
            storage.read("slot_1").unwrap().as_deref(),
            Some("{\"version\":1}")
        );

        storage.remove("slot_1").unwrap();
        assert_eq!(storage.read("slot_1").unwrap(), None);
        // Removing a missing key is not an error.
        storage.remove("slot_1").unwrap();
    }
}
