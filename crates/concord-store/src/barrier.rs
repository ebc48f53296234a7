//! Project-scoped bulk-operation barrier
//!
//! Diff and merge reads of one project run under the shared side and do not
//! block each other. A bulk rewrite of the project's stored annotation sets
//! runs under the exclusive side, so no reader observes a half-rewritten
//! project.

use crate::errors::{poisoned, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug, Default)]
pub struct ProjectBarrier {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl ProjectBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, project_id: &str) -> Result<Arc<RwLock<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| poisoned("project barrier registry", project_id))?;
        Ok(Arc::clone(
            locks
                .entry(project_id.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(()))),
        ))
    }

    /// Run `f` while holding the shared side for `project_id`
    pub fn shared<T>(&self, project_id: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.lock_for(project_id)?;
        let _guard = lock
            .read()
            .map_err(|_| poisoned("project barrier", project_id))?;
        f()
    }

    /// Run `f` while holding the exclusive side for `project_id`
    pub fn exclusive<T>(&self, project_id: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.lock_for(project_id)?;
        let _guard = lock
            .write()
            .map_err(|_| poisoned("project barrier", project_id))?;
        tracing::debug!(project_id, "Holding exclusive project barrier");
        f()
    }
}
