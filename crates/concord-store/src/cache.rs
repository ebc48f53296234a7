//! Per-document cache of decoded annotation sets
//!
//! Entries are keyed by the blob digest they were decoded from, so a lookup
//! after a rewrite misses even before the entry is invalidated. Writers
//! still invalidate explicitly; bulk rewrites do so while holding the
//! project's exclusive barrier.

use concord_core::model::{AnnotationStore, SourceLabel};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct CachedSet {
    digest: String,
    store: Arc<AnnotationStore>,
}

type Entries = HashMap<String, HashMap<SourceLabel, CachedSet>>;

/// Decoded stores keyed by document, then source
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: Mutex<Entries>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Entries are plain data; a panic while holding the lock cannot leave
    // one half-written, so a poisoned lock is still usable.
    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached store of `source`, if it was decoded from `digest`
    pub fn get(
        &self,
        document_id: &str,
        source: &SourceLabel,
        digest: &str,
    ) -> Option<Arc<AnnotationStore>> {
        self.entries()
            .get(document_id)
            .and_then(|sets| sets.get(source))
            .filter(|cached| cached.digest == digest)
            .map(|cached| Arc::clone(&cached.store))
    }

    pub fn put(
        &self,
        document_id: &str,
        source: &SourceLabel,
        digest: &str,
        store: Arc<AnnotationStore>,
    ) {
        self.entries()
            .entry(document_id.to_string())
            .or_default()
            .insert(
                source.clone(),
                CachedSet {
                    digest: digest.to_string(),
                    store,
                },
            );
    }

    /// Drop every cached set of `document_id`
    pub fn invalidate_document(&self, document_id: &str) {
        if self.entries().remove(document_id).is_some() {
            tracing::debug!(document_id, "Invalidated document cache");
        }
    }

    /// Drop the cached sets of several documents at once
    pub fn invalidate_documents<'a>(&self, document_ids: impl IntoIterator<Item = &'a str>) {
        let mut entries = self.entries();
        for document_id in document_ids {
            entries.remove(document_id);
        }
    }

    /// Number of cached sets across all documents
    pub fn len(&self) -> usize {
        self.entries().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
