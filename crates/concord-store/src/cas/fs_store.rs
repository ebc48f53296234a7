//! Filesystem-based content-addressable storage

use crate::cas::atomic::atomic_write;
use crate::cas::sharding::shard_path;
use crate::errors::{cas_collision, cas_missing, io_error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of serialized annotation sets
pub const BLOB_EXTENSION: &str = "json";

/// Hex SHA256 of `content`
pub fn digest_of(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Filesystem-based CAS store
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a blob and return its digest
    ///
    /// Writing the same bytes twice is a no-op. Finding different bytes
    /// under the digest fails with a collision.
    pub fn write(&self, content: &[u8]) -> Result<String> {
        let digest = digest_of(content);
        let target_path = self.path_of(&digest);

        if target_path.exists() {
            let existing = fs::read(&target_path).map_err(|e| io_error("read_cas", e))?;
            if existing == content {
                return Ok(digest);
            }
            return Err(cas_collision(&digest));
        }

        atomic_write(&target_path, content)?;

        Ok(digest)
    }

    /// Read a blob by digest
    ///
    /// Fails with `NotFound` if no blob is stored under `digest`.
    pub fn read(&self, digest: &str) -> Result<Vec<u8>> {
        let path = self.path_of(digest);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(cas_missing(digest)),
            Err(e) => Err(io_error("read_cas", e)),
        }
    }

    pub fn contains(&self, digest: &str) -> bool {
        self.path_of(digest).exists()
    }

    fn path_of(&self, digest: &str) -> PathBuf {
        shard_path(&self.root, digest, BLOB_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::errors::ExErrorKind;
    use tempfile::TempDir;

    fn setup_test_cas() -> (FsStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cas = FsStore::new(temp_dir.path());
        (cas, temp_dir)
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (cas, _dir) = setup_test_cas();
        let digest = cas.write(b"{\"source\":\"alice\"}").unwrap();
        assert_eq!(cas.read(&digest).unwrap(), b"{\"source\":\"alice\"}");
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn test_idempotent_write() {
        let (cas, _dir) = setup_test_cas();
        let d1 = cas.write(b"same").unwrap();
        let d2 = cas.write(b"same").unwrap();
        assert_eq!(d1, d2);
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (cas, _dir) = setup_test_cas();
        let err = cas.read(&"0".repeat(64)).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
    }

    #[test]
    fn test_tampered_blob_is_a_collision() {
        let (cas, dir) = setup_test_cas();
        let digest = cas.write(b"original").unwrap();
        let path = shard_path(dir.path(), &digest, BLOB_EXTENSION);
        fs::write(&path, b"tampered").unwrap();

        let err = cas.write(b"original").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Corrupt);
    }
}
