//! Codebook ordinals
//!
//! Ordinals are unique per project (enforced by the schema). Swaps go
//! through [`concord_core::ordering::swap_ordinals`] so that they are
//! serialized per project, and every write lands in one transaction.

use super::annotation_repo::AnnotationRepository;
use crate::errors::{from_rusqlite, Result};
use concord_core::errors::{ConcordError, ExError, ExErrorKind};
use concord_core::ordering::{swap_ordinals, OrdinalStore, ProjectOrderLocks};
use rusqlite::{Connection, OptionalExtension};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codebook {
    pub project_id: String,
    pub name: String,
    pub ordinal: u32,
}

impl AnnotationRepository {
    /// Append a codebook to the end of the project's order
    pub fn add_codebook(&self, project_id: &str, name: &str) -> Result<Codebook> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("add_codebook")
                .with_message("Codebook name must not be empty"));
        }

        let tx = self
            .connection()
            .unchecked_transaction()
            .map_err(from_rusqlite)?;
        let exists: bool = tx
            .query_row(
                "SELECT 1 FROM codebooks WHERE project_id = ?1 AND name = ?2",
                rusqlite::params![project_id, name],
                |_| Ok(true),
            )
            .optional()
            .map_err(from_rusqlite)?
            .unwrap_or(false);
        if exists {
            return Err(ExError::new(ExErrorKind::AlreadyExists)
                .with_op("add_codebook")
                .with_message(format!(
                    "Codebook {} already exists in project {}",
                    name, project_id
                )));
        }

        let ordinal: u32 = tx
            .query_row(
                "SELECT COALESCE(MAX(ordinal) + 1, 0) FROM codebooks WHERE project_id = ?1",
                [project_id],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        tx.execute(
            "INSERT INTO codebooks (project_id, name, ordinal, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                project_id,
                name,
                ordinal,
                chrono::Utc::now().timestamp_millis()
            ],
        )
        .map_err(from_rusqlite)?;
        tx.commit().map_err(from_rusqlite)?;

        Ok(Codebook {
            project_id: project_id.to_string(),
            name: name.to_string(),
            ordinal,
        })
    }

    /// Codebooks of `project_id` in ordinal order
    pub fn list_codebooks(&self, project_id: &str) -> Result<Vec<Codebook>> {
        let mut stmt = self
            .connection()
            .prepare(
                "SELECT project_id, name, ordinal FROM codebooks
                 WHERE project_id = ?1 ORDER BY ordinal",
            )
            .map_err(from_rusqlite)?;
        let codebooks = stmt
            .query_map([project_id], |row| {
                Ok(Codebook {
                    project_id: row.get(0)?,
                    name: row.get(1)?,
                    ordinal: row.get(2)?,
                })
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(codebooks)
    }

    /// Swap the ordinals of codebooks `a` and `b`
    ///
    /// Returns the new ordinals of `(a, b)`.
    pub fn swap_codebook_ordinals(
        &self,
        locks: &ProjectOrderLocks,
        project_id: &str,
        a: &str,
        b: &str,
    ) -> Result<(u32, u32)> {
        let mut ordinals = CodebookOrdinals::new(self.connection());
        swap_ordinals(locks, &mut ordinals, project_id, a, b)
    }
}

/// [`OrdinalStore`] over the `codebooks` table
pub struct CodebookOrdinals<'c> {
    conn: &'c Connection,
}

impl<'c> CodebookOrdinals<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl OrdinalStore for CodebookOrdinals<'_> {
    fn ordinal(&mut self, scope: &str, item: &str) -> std::result::Result<u32, ExError> {
        self.conn
            .query_row(
                "SELECT ordinal FROM codebooks WHERE project_id = ?1 AND name = ?2",
                rusqlite::params![scope, item],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?
            .ok_or_else(|| {
                ExError::from(ConcordError::OrderedItemNotFound {
                    item: item.to_string(),
                })
            })
    }

    fn write_ordinals(
        &mut self,
        scope: &str,
        assignments: &[(String, u32)],
    ) -> std::result::Result<(), ExError> {
        let tx = self.conn.unchecked_transaction().map_err(from_rusqlite)?;
        // Park the rows on negative ordinals first: UNIQUE(project_id, ordinal)
        // is checked per statement, and a swap passes through a duplicate.
        for (parked, (item, _)) in assignments.iter().enumerate() {
            tx.execute(
                "UPDATE codebooks SET ordinal = ?3 WHERE project_id = ?1 AND name = ?2",
                rusqlite::params![scope, item, -1 - parked as i64],
            )
            .map_err(from_rusqlite)?;
        }
        for (item, ordinal) in assignments {
            tx.execute(
                "UPDATE codebooks SET ordinal = ?3 WHERE project_id = ?1 AND name = ?2",
                rusqlite::params![scope, item, ordinal],
            )
            .map_err(from_rusqlite)?;
        }
        tx.commit().map_err(from_rusqlite)
    }
}
