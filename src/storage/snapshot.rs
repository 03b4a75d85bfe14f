// src/storage/snapshot.rs

//! Normalized-text snapshots, kept so a change can be reported with the
//! lines that were added instead of just "something changed".

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::services::fingerprint::digest;
use crate::storage::{read_optional, write_atomic};

/// One text file per target, named after a hash of the target URL.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, target_id: &str) -> PathBuf {
        let name = &digest(target_id)[..16];
        self.dir.join(format!("{name}.txt"))
    }

    /// Last saved text for a target. Missing or unreadable snapshots are `None`.
    pub async fn read(&self, target_id: &str) -> Option<String> {
        let path = self.path_for(target_id);
        match read_optional(&path).await {
            Ok(Some(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => Some(text),
                Err(e) => {
                    log::warn!("Snapshot {} is not UTF-8: {}", path.display(), e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("Cannot read snapshot {}: {}", path.display(), e);
                None
            }
        }
    }

    pub async fn write(&self, target_id: &str, text: &str) -> Result<()> {
        write_atomic(&self.path_for(target_id), text.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_snapshot_round_trip_per_target() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(tmp.path().join("snapshots"));

        assert_eq!(store.read("https://a.example.gov").await, None);

        store.write("https://a.example.gov", "Edital\nAnexo I").await.unwrap();
        store.write("https://b.example.gov", "Outro").await.unwrap();

        assert_eq!(
            store.read("https://a.example.gov").await.as_deref(),
            Some("Edital\nAnexo I")
        );
        assert_eq!(store.read("https://b.example.gov").await.as_deref(), Some("Outro"));
    }

    #[test]
    fn test_file_names_are_stable() {
        let store = SnapshotStore::new("snaps");
        let a = store.path_for("https://a.example.gov");
        assert_eq!(a, store.path_for("https://a.example.gov"));
        assert_ne!(a, store.path_for("https://b.example.gov"));
        assert_eq!(a.extension().unwrap(), "txt");
    }
}
