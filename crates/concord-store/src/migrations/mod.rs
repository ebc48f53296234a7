//! Schema migrations
//!
//! Each migration runs once inside a transaction; its checksum is recorded
//! in `schema_version` and verified on every later open.

mod embedded;
mod runner;

pub use embedded::{compute_checksum, get_migrations, Migration};
pub use runner::{applied_migrations, apply_migrations};
