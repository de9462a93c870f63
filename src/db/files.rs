//! File record repository.
//!
//! File storage itself lives elsewhere; this table only records the
//! metadata chat attachments point at.

use super::{DbError, placeholders};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};

/// Names bound per `IN (...)` query; stays under SQLite's variable limit.
const MAX_BATCH: usize = 500;

/// Stored file metadata.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FileRecord {
    pub name: String,
    pub file_name: String,
    pub file_url: String,
    pub is_private: bool,
    pub owner: String,
}

/// Repository for file records.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new file repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a file. Existing records with the same name are replaced.
    #[cfg(test)]
    pub async fn insert(&self, file: &FileRecord) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO files (name, file_name, file_url, is_private, owner, creation)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&file.name)
        .bind(&file.file_name)
        .bind(&file.file_url)
        .bind(file.is_private)
        .bind(&file.owner)
        .bind(super::now_nanos())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fetch metadata for a batch of file names, [`MAX_BATCH`] names per query.
    pub async fn resolve_many(&self, names: &[String]) -> Result<HashMap<String, FileRecord>, DbError> {
        let mut out = HashMap::with_capacity(names.len());
        for chunk in names.chunks(MAX_BATCH) {
            let query = format!(
                "SELECT name, file_name, file_url, is_private, owner FROM files WHERE name IN ({})",
                placeholders(chunk.len())
            );
            let mut q = sqlx::query_as::<_, FileRecord>(&query);
            for name in chunk {
                q = q.bind(name);
            }

            let rows = q.fetch_all(self.pool).await?;
            out.extend(rows.into_iter().map(|f| (f.name.clone(), f)));
        }
        Ok(out)
    }

    /// Return the subset of `names` that `user` may read.
    ///
    /// Public files are readable by everyone, private files only by their
    /// owner unless `unrestricted` is set.
    pub async fn readable_by(
        &self,
        user: &str,
        names: &[String],
        unrestricted: bool,
    ) -> Result<HashSet<String>, DbError> {
        let mut out = HashSet::new();
        for chunk in names.chunks(MAX_BATCH) {
            let query = format!(
                "SELECT name FROM files WHERE name IN ({}) AND (is_private = 0 OR owner = ? OR ?)",
                placeholders(chunk.len())
            );
            let mut q = sqlx::query_scalar::<_, String>(&query);
            for name in chunk {
                q = q.bind(name);
            }
            q = q.bind(user).bind(unrestricted);

            out.extend(q.fetch_all(self.pool).await?);
        }
        Ok(out)
    }
}
