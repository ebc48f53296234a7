// Integration tests for the filesystem CAS

use concord_core::errors::ExErrorKind;
use concord_store::cas::{digest_of, FsStore};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn test_digest_is_sha256_of_content() {
    let dir = TempDir::new().unwrap();
    let cas = FsStore::new(dir.path());
    let digest = cas.write(b"abc").unwrap();
    assert_eq!(
        digest,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(digest, digest_of(b"abc"));
    assert!(cas.contains(&digest));
}

#[test]
fn test_concurrent_writers_of_same_blob() {
    let dir = TempDir::new().unwrap();
    let cas = Arc::new(FsStore::new(dir.path()));
    let content = b"{\"source\":\"alice\",\"annotations\":[]}".to_vec();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cas = Arc::clone(&cas);
            let content = content.clone();
            thread::spawn(move || cas.write(&content).unwrap())
        })
        .collect();
    let digests: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(digests.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(cas.read(&digests[0]).unwrap(), content);
}

#[test]
fn test_unknown_digest_is_not_found() {
    let dir = TempDir::new().unwrap();
    let cas = FsStore::new(dir.path());
    let err = cas.read(&"f".repeat(64)).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert_eq!(err.code(), "ERR_NOT_FOUND");
}
