//! Blob storage and the intake tables

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Where uploaded bytes are kept, keyed by store path.
pub trait BlobStore: Send {
    fn put(&mut self, key: &str, bytes: &[u8]) -> io::Result<()>;

    fn remove(&mut self, key: &str) -> io::Result<()>;

    fn contains(&self, key: &str) -> bool;
}

/// Blob store held in memory
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.blobs.get(key).map(Vec::as_slice)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&mut self, key: &str, bytes: &[u8]) -> io::Result<()> {
        self.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.blobs.remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }
}

/// Blob store rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key below the root; keys escaping it are rejected.
    fn resolve(&self, key: &str) -> io::Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));

        if escapes || key.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid store path: {}", key),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for DirBlobStore {
    fn put(&mut self, key: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.resolve(key)?) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.resolve(key).map(|p| p.is_file()).unwrap_or(false)
    }
}

/// Audit row for one stored upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<u64>,
    pub filename: String,
    pub path: String,
    pub store_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catatan_id: Option<u64>,
}

/// Income record created from an extracted amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub id: u64,
    pub amount: i64,
}

/// Upload and financial record tables. Identities start at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeLedger {
    #[serde(default)]
    uploads: Vec<UploadRecord>,
    #[serde(default)]
    records: Vec<FinancialRecord>,
    next_upload_id: u64,
    next_record_id: u64,
}

impl Default for IntakeLedger {
    fn default() -> Self {
        Self {
            uploads: Vec::new(),
            records: Vec::new(),
            next_upload_id: 1,
            next_record_id: 1,
        }
    }
}

impl IntakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a ledger saved with [`IntakeLedger::save`]; a missing file is empty.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        serde_yaml::from_str(&contents)
            .map_err(|e| Error::Other(format!("Failed to read intake ledger: {}", e)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_yaml::to_string(self)
            .map_err(|e| Error::Other(format!("Failed to write intake ledger: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn uploads(&self) -> &[UploadRecord] {
        &self.uploads
    }

    pub fn records(&self) -> &[FinancialRecord] {
        &self.records
    }

    pub fn find_upload(&self, profile_id: Option<u64>, filename: &str) -> Option<&UploadRecord> {
        self.uploads
            .iter()
            .find(|u| u.profile_id == profile_id && u.filename == filename)
    }

    pub fn insert_upload(
        &mut self,
        profile_id: Option<u64>,
        filename: &str,
        path: String,
        store_path: String,
    ) -> u64 {
        let id = self.next_upload_id;
        self.next_upload_id += 1;
        self.uploads.push(UploadRecord {
            id,
            profile_id,
            filename: filename.to_string(),
            path,
            store_path,
            catatan_id: None,
        });
        id
    }

    pub fn insert_record(&mut self, amount: i64) -> u64 {
        let id = self.next_record_id;
        self.next_record_id += 1;
        self.records.push(FinancialRecord { id, amount });
        id
    }

    /// Link an upload to a financial record. An existing link is never replaced.
    pub fn link(&mut self, upload_id: u64, record_id: u64) -> bool {
        match self.uploads.iter_mut().find(|u| u.id == upload_id) {
            Some(upload) if upload.catatan_id.is_none() => {
                upload.catatan_id = Some(record_id);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryBlobStore::new();
        store.put("public/keu/a.jpg", b"abc").unwrap();
        assert!(store.contains("public/keu/a.jpg"));
        assert_eq!(store.get("public/keu/a.jpg"), Some(&b"abc"[..]));

        store.remove("public/keu/a.jpg").unwrap();
        assert!(store.is_empty());
        store.remove("public/keu/a.jpg").unwrap();
    }

    #[test]
    fn test_dir_store_writes_nested_paths() {
        let dir = tempdir().unwrap();
        let mut store = DirBlobStore::new(dir.path());

        store.put("public/keu/a.jpg", b"abc").unwrap();
        assert_eq!(
            fs::read(dir.path().join("public/keu/a.jpg")).unwrap(),
            b"abc"
        );
        assert!(store.contains("public/keu/a.jpg"));

        store.remove("public/keu/a.jpg").unwrap();
        assert!(!store.contains("public/keu/a.jpg"));
        store.remove("public/keu/a.jpg").unwrap();
    }

    #[test]
    fn test_dir_store_rejects_escaping_keys() {
        let dir = tempdir().unwrap();
        let mut store = DirBlobStore::new(dir.path());

        let err = store.put("public/../../etc/x.jpg", b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(store.put("/abs/x.jpg", b"x").is_err());
        assert!(store.put("", b"x").is_err());
    }

    #[test]
    fn test_ledger_ids_start_at_one() {
        let mut ledger = IntakeLedger::new();
        let a = ledger.insert_upload(Some(1), "a.jpg", "keu/a.jpg".into(), "public/keu/a.jpg".into());
        let b = ledger.insert_upload(None, "b.jpg", "keu/b.jpg".into(), "public/keu/b.jpg".into());
        assert_eq!((a, b), (1, 2));
        assert_eq!(ledger.insert_record(500), 1);
    }

    #[test]
    fn test_ledger_find_matches_profile_and_filename() {
        let mut ledger = IntakeLedger::new();
        ledger.insert_upload(Some(7), "a.jpg", "keu/a.jpg".into(), "public/keu/a.jpg".into());

        assert!(ledger.find_upload(Some(7), "a.jpg").is_some());
        assert!(ledger.find_upload(Some(8), "a.jpg").is_none());
        assert!(ledger.find_upload(None, "a.jpg").is_none());
        assert!(ledger.find_upload(Some(7), "A.jpg").is_none());
    }

    #[test]
    fn test_link_is_once_only() {
        let mut ledger = IntakeLedger::new();
        let upload = ledger.insert_upload(None, "a.jpg", "keu/a.jpg".into(), "public/keu/a.jpg".into());

        assert!(ledger.link(upload, 1));
        assert!(!ledger.link(upload, 2));
        assert!(!ledger.link(99, 1));
        assert_eq!(ledger.uploads()[0].catatan_id, Some(1));
    }

    #[test]
    fn test_ledger_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.yaml");

        assert_eq!(IntakeLedger::load(&path).unwrap(), IntakeLedger::default());

        let mut ledger = IntakeLedger::new();
        let upload = ledger.insert_upload(Some(3), "a.jpg", "keu/a.jpg".into(), "public/keu/a.jpg".into());
        let record = ledger.insert_record(1200);
        ledger.link(upload, record);
        ledger.save(&path).unwrap();

        let loaded = IntakeLedger::load(&path).unwrap();
        assert_eq!(loaded, ledger);
        assert_eq!(loaded.clone().insert_upload(None, "b.jpg", String::new(), String::new()), 2);
    }
}
