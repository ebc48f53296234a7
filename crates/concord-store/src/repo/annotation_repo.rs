//! Documents and per-source annotation sets

use crate::barrier::ProjectBarrier;
use crate::cache::DocumentCache;
use crate::cas::FsStore;
use crate::db;
use crate::errors::{
    corrupt_store, document_not_found, from_rusqlite, serialization_error, store_not_found,
    CorruptReason, Result,
};
use crate::status::SetStatus;
use concord_core::errors::{ExError, ExErrorKind};
use concord_core::model::{AnnotationStore, SourceLabel, CURATION_SOURCE};
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::Arc;

/// A registered document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub document_id: String,
    pub project_id: String,
    pub name: String,
    pub created_at_ms: i64,
}

/// Metadata row of one source's annotation set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSetInfo {
    pub source: SourceLabel,
    pub status: SetStatus,
    pub digest: String,
    pub updated_at_ms: i64,
}

/// Store collaborator for the diff engine
///
/// One repository wraps one SQLite connection. Repositories opened on the
/// same database from several threads should share their cache and barrier
/// (see [`AnnotationRepository::with_shared`]).
pub struct AnnotationRepository {
    conn: Connection,
    cas: FsStore,
    cache: Arc<DocumentCache>,
    barrier: Arc<ProjectBarrier>,
}

impl AnnotationRepository {
    /// Wrap an already migrated connection
    pub fn new(conn: Connection, cas: FsStore) -> Self {
        Self::with_shared(
            conn,
            cas,
            Arc::new(DocumentCache::new()),
            Arc::new(ProjectBarrier::new()),
        )
    }

    pub fn with_shared(
        conn: Connection,
        cas: FsStore,
        cache: Arc<DocumentCache>,
        barrier: Arc<ProjectBarrier>,
    ) -> Self {
        Self {
            conn,
            cas,
            cache,
            barrier,
        }
    }

    /// Open (and migrate) the database at `db_path` with blobs under `cas_root`
    pub fn open(db_path: impl AsRef<Path>, cas_root: impl AsRef<Path>) -> Result<Self> {
        let conn = db::open_migrated(db_path)?;
        Ok(Self::new(conn, FsStore::new(cas_root.as_ref())))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn cas(&self) -> &FsStore {
        &self.cas
    }

    pub fn cache(&self) -> &Arc<DocumentCache> {
        &self.cache
    }

    pub fn barrier(&self) -> &Arc<ProjectBarrier> {
        &self.barrier
    }

    // ===== Documents =====

    /// Register `document_id` under `project_id`
    ///
    /// Registering the same document in the same project again is a no-op;
    /// moving it to another project fails with `AlreadyExists`.
    pub fn register_document(&self, project_id: &str, document_id: &str, name: &str) -> Result<()> {
        if let Some(existing) = self.document(document_id)? {
            if existing.project_id == project_id {
                return Ok(());
            }
            return Err(ExError::new(ExErrorKind::AlreadyExists)
                .with_op("register_document")
                .with_document_id(document_id)
                .with_message(format!(
                    "Document {} already belongs to project {}",
                    document_id, existing.project_id
                )));
        }

        self.conn
            .execute(
                "INSERT INTO documents (document_id, project_id, name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    document_id,
                    project_id,
                    name,
                    chrono::Utc::now().timestamp_millis()
                ],
            )
            .map_err(from_rusqlite)?;

        tracing::debug!(project_id, document_id, "Registered document");
        Ok(())
    }

    pub fn document(&self, document_id: &str) -> Result<Option<DocumentInfo>> {
        self.conn
            .query_row(
                "SELECT document_id, project_id, name, created_at FROM documents
                 WHERE document_id = ?1",
                [document_id],
                |row| {
                    Ok(DocumentInfo {
                        document_id: row.get(0)?,
                        project_id: row.get(1)?,
                        name: row.get(2)?,
                        created_at_ms: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(from_rusqlite)
    }

    /// Project of `document_id`
    pub fn document_project(&self, document_id: &str) -> Result<String> {
        self.document(document_id)?
            .map(|d| d.project_id)
            .ok_or_else(|| document_not_found("document_project", document_id))
    }

    /// Documents of `project_id` ordered by id
    pub fn list_documents(&self, project_id: &str) -> Result<Vec<DocumentInfo>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT document_id, project_id, name, created_at FROM documents
                 WHERE project_id = ?1 ORDER BY document_id",
            )
            .map_err(from_rusqlite)?;
        let docs = stmt
            .query_map([project_id], |row| {
                Ok(DocumentInfo {
                    document_id: row.get(0)?,
                    project_id: row.get(1)?,
                    name: row.get(2)?,
                    created_at_ms: row.get(3)?,
                })
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(docs)
    }

    // ===== Annotation sets =====

    /// Every stored set of `document_id` (including curation) ordered by source
    pub fn list_sets(&self, document_id: &str) -> Result<Vec<AnnotationSetInfo>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT source, status, digest, updated_at FROM annotation_sets
                 WHERE document_id = ?1 ORDER BY source",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([document_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        rows.into_iter()
            .map(|(source, status, digest, updated_at_ms)| {
                Ok(AnnotationSetInfo {
                    source: SourceLabel::from(source),
                    status: status.parse()?,
                    digest,
                    updated_at_ms,
                })
            })
            .collect()
    }

    /// Sources of `document_id` whose set has `required_status`
    ///
    /// The curation pseudo-source is never eligible for comparison. Labels
    /// are returned in lexicographic order.
    pub fn list_sources_with_status(
        &self,
        document_id: &str,
        required_status: SetStatus,
    ) -> Result<Vec<SourceLabel>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT source FROM annotation_sets
                 WHERE document_id = ?1 AND status = ?2 AND source <> ?3
                 ORDER BY source",
            )
            .map_err(from_rusqlite)?;
        let sources = stmt
            .query_map(
                rusqlite::params![document_id, required_status.as_str(), CURATION_SOURCE],
                |row| row.get::<_, String>(0),
            )
            .map_err(from_rusqlite)?
            .map(|r| r.map(SourceLabel::from))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(sources)
    }

    /// Read the annotation set of `source` for `document_id`
    ///
    /// # Errors
    ///
    /// - `NotFound` if the source has no set for the document
    /// - `Corrupt` if the blob is missing, undecodable, labelled with another
    ///   source, or fails validation
    pub fn read_store(&self, document_id: &str, source: &SourceLabel) -> Result<AnnotationStore> {
        let digest: Option<String> = self
            .conn
            .query_row(
                "SELECT digest FROM annotation_sets WHERE document_id = ?1 AND source = ?2",
                rusqlite::params![document_id, source.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        let digest = digest.ok_or_else(|| store_not_found(document_id, source))?;

        if let Some(cached) = self.cache.get(document_id, source, &digest) {
            return Ok((*cached).clone());
        }

        let store = self.decode_blob(document_id, source, &digest)?;
        self.cache
            .put(document_id, source, &digest, Arc::new(store.clone()));
        Ok(store)
    }

    fn decode_blob(
        &self,
        document_id: &str,
        source: &SourceLabel,
        digest: &str,
    ) -> Result<AnnotationStore> {
        let bytes = self.cas.read(digest).map_err(|e| {
            if e.kind() == ExErrorKind::NotFound {
                corrupt_store(
                    document_id,
                    source,
                    CorruptReason::BlobMissing {
                        digest: digest.to_string(),
                    },
                )
            } else {
                e
            }
        })?;

        let store: AnnotationStore = serde_json::from_slice(&bytes).map_err(|e| {
            corrupt_store(
                document_id,
                source,
                CorruptReason::Undecodable {
                    digest: digest.to_string(),
                    message: e.to_string(),
                },
            )
        })?;

        if store.source() != source {
            return Err(corrupt_store(
                document_id,
                source,
                CorruptReason::SourceMismatch {
                    found: store.source().to_string(),
                },
            ));
        }

        store.validate().map_err(|e| {
            corrupt_store(
                document_id,
                source,
                CorruptReason::Invalid {
                    message: e.to_string(),
                },
            )
        })?;

        Ok(store)
    }

    /// Store `store` as the set of `source` for `document_id` and return its digest
    ///
    /// The store must be labelled with `source` and pass validation.
    pub fn write_store(
        &self,
        document_id: &str,
        source: &SourceLabel,
        store: &AnnotationStore,
        status: SetStatus,
    ) -> Result<String> {
        if self.document(document_id)?.is_none() {
            return Err(document_not_found("write_store", document_id));
        }

        let bytes = encode_store(document_id, source, store)?;
        let digest = self.cas.write(&bytes)?;

        let tx = self.conn.unchecked_transaction().map_err(from_rusqlite)?;
        upsert_set(&tx, document_id, source, status, &digest, bytes.len())?;
        tx.commit().map_err(from_rusqlite)?;

        self.cache.invalidate_document(document_id);

        tracing::debug!(
            document_id,
            source = %source,
            status = %status,
            digest = %digest,
            size_bytes = bytes.len(),
            "Wrote annotation set"
        );
        Ok(digest)
    }

    /// Change the status of an existing set
    pub fn set_status(&self, document_id: &str, source: &SourceLabel, status: SetStatus) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE annotation_sets SET status = ?3, updated_at = ?4
                 WHERE document_id = ?1 AND source = ?2",
                rusqlite::params![
                    document_id,
                    source.as_str(),
                    status.as_str(),
                    chrono::Utc::now().timestamp_millis()
                ],
            )
            .map_err(from_rusqlite)?;
        if changed == 0 {
            return Err(store_not_found(document_id, source).with_op("set_status"));
        }
        Ok(())
    }

    /// Run `f` under the shared side of the document's project barrier
    ///
    /// All stores read inside `f` come from one consistent state of the
    /// project: no bulk rewrite can run concurrently.
    pub fn read_consistent<T>(
        &self,
        document_id: &str,
        f: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        let project_id = self.document_project(document_id)?;
        self.barrier.shared(&project_id, || f(self))
    }

    /// Rewrite every stored set of `project_id` under the exclusive barrier
    ///
    /// `f` receives each set (curation included) and returns a replacement,
    /// or `None` to leave it unchanged. All row updates are committed in one
    /// transaction and the project's cached sets are dropped before the
    /// barrier is released. Returns the number of rewritten sets.
    pub fn rewrite_project<F>(&self, project_id: &str, mut f: F) -> Result<usize>
    where
        F: FnMut(&str, &SourceLabel, AnnotationStore) -> Result<Option<AnnotationStore>>,
    {
        self.barrier.exclusive(project_id, || {
            let documents = self.list_documents(project_id)?;
            let mut rewrites = Vec::new();

            for doc in &documents {
                for set in self.list_sets(&doc.document_id)? {
                    let current = self.decode_blob(&doc.document_id, &set.source, &set.digest)?;
                    if let Some(replacement) = f(&doc.document_id, &set.source, current)? {
                        let bytes = encode_store(&doc.document_id, &set.source, &replacement)?;
                        let digest = self.cas.write(&bytes)?;
                        if digest != set.digest {
                            rewrites.push((doc.document_id.clone(), set, digest, bytes.len()));
                        }
                    }
                }
            }

            let tx = self.conn.unchecked_transaction().map_err(from_rusqlite)?;
            for (document_id, set, digest, size) in &rewrites {
                upsert_set(&tx, document_id, &set.source, set.status, digest, *size)?;
            }
            tx.commit().map_err(from_rusqlite)?;

            self.cache
                .invalidate_documents(documents.iter().map(|d| d.document_id.as_str()));

            tracing::info!(
                project_id,
                document_count = documents.len(),
                rewritten = rewrites.len(),
                "Rewrote project annotation sets"
            );
            Ok(rewrites.len())
        })
    }
}

fn encode_store(document_id: &str, source: &SourceLabel, store: &AnnotationStore) -> Result<Vec<u8>> {
    if store.source() != source {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("write_store")
            .with_document_id(document_id)
            .with_source_label(source.as_str())
            .with_message(format!(
                "Store is labelled {} but is written as {}",
                store.source(),
                source
            )));
    }
    store.validate().map_err(|e| {
        ExError::new(ExErrorKind::InvalidInput)
            .with_op("write_store")
            .with_document_id(document_id)
            .with_source_label(source.as_str())
            .with_message(e.to_string())
    })?;
    serde_json::to_vec(store).map_err(|e| serialization_error("write_store", e))
}

fn upsert_set(
    tx: &Transaction,
    document_id: &str,
    source: &SourceLabel,
    status: SetStatus,
    digest: &str,
    size_bytes: usize,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    tx.execute(
        "INSERT OR IGNORE INTO cas_blobs (digest, size_bytes, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![digest, size_bytes as i64, now],
    )
    .map_err(from_rusqlite)?;
    tx.execute(
        "INSERT INTO annotation_sets (document_id, source, status, digest, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(document_id, source) DO UPDATE SET
            status = excluded.status,
            digest = excluded.digest,
            updated_at = excluded.updated_at",
        rusqlite::params![document_id, source.as_str(), status.as_str(), digest, now],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::model::AnnotationInstance;
    use tempfile::TempDir;

    fn repo() -> (AnnotationRepository, TempDir) {
        let dir = TempDir::new().unwrap();
        let repo = AnnotationRepository::open(dir.path().join("concord.db"), dir.path().join("cas"))
            .unwrap();
        (repo, dir)
    }

    #[test]
    fn test_read_store_served_from_cache_after_first_read() {
        let (repo, _dir) = repo();
        repo.register_document("p1", "doc-1", "doc-1.txt").unwrap();
        let alice = SourceLabel::from("alice");
        let mut store = AnnotationStore::new("alice");
        store.push(AnnotationInstance::span("Entity", 0, 4).with_feature("value", "ORG"));
        repo.write_store("doc-1", &alice, &store, SetStatus::Finished)
            .unwrap();

        assert!(repo.cache().is_empty());
        assert_eq!(repo.read_store("doc-1", &alice).unwrap(), store);
        assert_eq!(repo.cache().len(), 1);
        assert_eq!(repo.read_store("doc-1", &alice).unwrap(), store);
    }

    #[test]
    fn test_write_invalidates_cached_document() {
        let (repo, _dir) = repo();
        repo.register_document("p1", "doc-1", "doc-1.txt").unwrap();
        let alice = SourceLabel::from("alice");
        repo.write_store("doc-1", &alice, &AnnotationStore::new("alice"), SetStatus::InProgress)
            .unwrap();
        repo.read_store("doc-1", &alice).unwrap();
        assert_eq!(repo.cache().len(), 1);

        let mut edited = AnnotationStore::new("alice");
        edited.push(AnnotationInstance::span("Entity", 1, 2));
        repo.write_store("doc-1", &alice, &edited, SetStatus::Finished)
            .unwrap();
        assert!(repo.cache().is_empty());
        assert_eq!(repo.read_store("doc-1", &alice).unwrap(), edited);
    }

    #[test]
    fn test_mislabelled_store_rejected() {
        let (repo, _dir) = repo();
        repo.register_document("p1", "doc-1", "doc-1.txt").unwrap();
        let err = repo
            .write_store(
                "doc-1",
                &SourceLabel::from("alice"),
                &AnnotationStore::new("bob"),
                SetStatus::Finished,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }
}
