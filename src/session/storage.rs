//! Durable key/value storage for the remembered session

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Result, SessionError};

/// String key/value storage surviving process restarts.
pub trait Storage: Send + Sync {
    /// Read an entry; unreadable storage reads as empty.
    fn get(&self, key: &str) -> Option<String>;

    /// Write an entry.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete an entry; deleting a missing key succeeds.
    fn remove(&self, key: &str) -> Result<()>;
}

/// YAML map on disk, rewritten on every change.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_all(&self) -> BTreeMap<String, String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|contents| serde_yaml::from_str(&contents).ok())
            .unwrap_or_default()
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(entries).map_err(|e| SessionError::Storage(e.to_string()))?;
        std::fs::write(&self.path, contents)?;

        // The file holds a bearer token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_all();
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.read_all();
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub use memory::MemoryStorage;
