//! Persistence for fingerprints and text snapshots.
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! ├── hashes.json           # target url → fingerprint
//! └── snapshots/            # normalized text per target (optional)
//!     └── 3f9a1c0e5b7d2a41.txt
//! ```

pub mod snapshot;
pub mod state;

use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::error::Result;

pub use snapshot::SnapshotStore;
pub use state::FingerprintStore;

/// Write bytes atomically (write to temp, then rename).
///
/// A crash mid-write leaves the previous file untouched.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = Path::new(&tmp_name);

    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(tmp, path).await?;
    Ok(())
}

/// Read a file, returning None if it doesn't exist.
pub(crate) async fn read_optional(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
