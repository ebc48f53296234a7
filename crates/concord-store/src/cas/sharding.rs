//! Shard layout: `<root>/<first two hex chars>/<digest>.<ext>`

use std::path::{Path, PathBuf};

pub fn shard_path(root: &Path, digest: &str, extension: &str) -> PathBuf {
    let shard = digest.get(..2).unwrap_or(digest);
    root.join(shard).join(format!("{}.{}", digest, extension))
}
