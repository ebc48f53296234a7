//! Content-addressable storage for annotation set blobs
//!
//! - SHA256 digests, hex encoded
//! - atomic temp->rename writes
//! - collision detection on rewrite
//! - sharding by the first 2 hex chars of the digest

mod atomic;
mod fs_store;
mod sharding;

pub use fs_store::{digest_of, FsStore, BLOB_EXTENSION};
