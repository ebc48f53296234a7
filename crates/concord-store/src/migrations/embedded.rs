//! SQL migrations compiled into the binary

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

macro_rules! migration {
    ($id:literal) => {
        Migration {
            id: $id,
            sql: include_str!(concat!("../../migrations/", $id, ".sql")),
        }
    };
}

static MIGRATIONS: &[Migration] = &[
    migration!("001_initial_schema"),
    migration!("002_codebooks"),
];

/// Every migration, in application order
pub fn get_migrations() -> &'static [Migration] {
    MIGRATIONS
}

/// Checksum recorded for a migration's SQL
///
/// Compared on every later run so that an edited migration which already
/// ran is detected.
pub fn compute_checksum(sql: &str) -> String {
    crate::cas::digest_of(sql.as_bytes())
}
