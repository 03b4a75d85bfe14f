// src/storage/state.rs

//! Fingerprint store.
//!
//! A flat JSON object mapping target URL to the hex digest of its last
//! observed text. Keys are kept sorted so that saving an unchanged store
//! always produces the same bytes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::storage::{read_optional, write_atomic};

/// Durable mapping from target identifier to fingerprint.
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    path: PathBuf,
    records: BTreeMap<String, String>,
}

impl FingerprintStore {
    /// Empty store that will be saved to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: BTreeMap::new(),
        }
    }

    /// Load the store from `path`.
    ///
    /// A missing file is a fresh start. An unreadable or corrupt file is
    /// logged and also treated as empty: one bad write must not stop every
    /// later run.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::new(path);

        let bytes = match read_optional(&store.path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::info!(
                    "No fingerprint file at {}; starting fresh",
                    store.path.display()
                );
                return store;
            }
            Err(e) => {
                log::warn!(
                    "Cannot read fingerprint file {}: {}. Starting fresh",
                    store.path.display(),
                    e
                );
                return store;
            }
        };

        match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
            Ok(records) => {
                log::debug!(
                    "Loaded {} fingerprints from {}",
                    records.len(),
                    store.path.display()
                );
                store.records = records;
            }
            Err(e) => log::warn!(
                "Fingerprint file {} is corrupt: {}. Starting fresh",
                store.path.display(),
                e
            ),
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored fingerprint for a target, if it was ever observed.
    pub fn get(&self, target_id: &str) -> Option<&str> {
        self.records.get(target_id).map(String::as_str)
    }

    /// Insert or replace a target's fingerprint.
    pub fn put(&mut self, target_id: impl Into<String>, fingerprint: impl Into<String>) {
        self.records.insert(target_id.into(), fingerprint.into());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialized form of the store.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(&self.records)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Write the full mapping, replacing the previous file atomically.
    pub async fn save(&self) -> Result<()> {
        write_atomic(&self.path, &self.to_bytes()?).await?;
        log::debug!(
            "Saved {} fingerprints to {}",
            self.records.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FP_A: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
    const FP_B: &str = "60303ae22b998861bce3b28f33eec1be758a213c86c93c076dbe9f558c11c752";

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = FingerprintStore::load(tmp.path().join("hashes.json")).await;
        assert!(store.is_empty());
        assert_eq!(store.get("https://example.gov"), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hashes.json");
        std::fs::write(&path, b"{ \"https://example.gov\": ").unwrap();

        let store = FingerprintStore::load(&path).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_shape_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hashes.json");
        std::fs::write(&path, b"[1, 2, 3]").unwrap();

        assert!(FingerprintStore::load(&path).await.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state/hashes.json");

        let mut store = FingerprintStore::load(&path).await;
        store.put("https://b.example.gov", FP_B);
        store.put("https://a.example.gov", FP_A);
        store.save().await.unwrap();

        let reloaded = FingerprintStore::load(&path).await;
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("https://a.example.gov"), Some(FP_A));
        assert_eq!(reloaded.get("https://b.example.gov"), Some(FP_B));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let mut store = FingerprintStore::new("unused.json");
        store.put("https://a.example.gov", FP_A);
        store.put("https://a.example.gov", FP_B);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("https://a.example.gov"), Some(FP_B));
    }

    #[tokio::test]
    async fn test_save_twice_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hashes.json");

        let mut store = FingerprintStore::new(&path);
        store.put("https://z.example.gov", FP_B);
        store.put("https://a.example.gov", FP_A);

        store.save().await.unwrap();
        let first = std::fs::read(&path).unwrap();
        store.save().await.unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_reads_plain_json_object() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hashes.json");
        std::fs::write(&path, format!("{{\"https://a.example.gov\": \"{FP_A}\"}}")).unwrap();

        let store = FingerprintStore::load(&path).await;
        assert_eq!(store.get("https://a.example.gov"), Some(FP_A));
    }
}
