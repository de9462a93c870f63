//! Project repository.
//!
//! Projects are the conversation scope for chat messages and the
//! membership boundary for project-scoped permissions.

use super::{DbError, now_nanos};
use sqlx::SqlitePool;

/// Repository for project operations.
pub struct ProjectRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProjectRepository<'a> {
    /// Create a new project repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a project or update its display name.
    pub async fn upsert(&self, name: &str, project_name: Option<&str>) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO projects (name, project_name, creation)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET project_name = excluded.project_name
            "#,
        )
        .bind(name)
        .bind(project_name)
        .bind(now_nanos())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Check whether a project exists.
    pub async fn exists(&self, name: &str) -> Result<bool, DbError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM projects WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Add a member to a project. Idempotent.
    pub async fn add_member(&self, project: &str, user_id: &str) -> Result<(), DbError> {
        sqlx::query("INSERT OR IGNORE INTO project_members (project, user_id) VALUES (?, ?)")
            .bind(project)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Check whether a user is a member of a project.
    pub async fn is_member(&self, project: &str, user_id: &str) -> Result<bool, DbError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM project_members WHERE project = ? AND user_id = ?")
                .bind(project)
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.is_some())
    }
}
