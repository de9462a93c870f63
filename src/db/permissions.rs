//! Role and permission repository.
//!
//! Backs [`crate::security::permissions::DbAccessPolicy`]: role grants per
//! (doctype, permission type), unrestricted roles, and the project a
//! document is scoped to.

use super::DbError;
use crate::doctype;
use sqlx::SqlitePool;

/// Repository for roles and grants.
pub struct PermissionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PermissionRepository<'a> {
    /// Create a new permission repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a role or update its unrestricted flag.
    pub async fn upsert_role(&self, name: &str, unrestricted: bool) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO roles (name, unrestricted) VALUES (?, ?)
            ON CONFLICT(name) DO UPDATE SET unrestricted = excluded.unrestricted
            "#,
        )
        .bind(name)
        .bind(unrestricted)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Replace every grant held by a role.
    pub async fn set_grants(&self, role: &str, grants: &[(String, String)]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE role = ?")
            .bind(role)
            .execute(&mut *tx)
            .await?;

        for (doctype, ptype) in grants {
            sqlx::query(
                "INSERT OR IGNORE INTO role_permissions (role, doctype, ptype) VALUES (?, ?, ?)",
            )
            .bind(role)
            .bind(doctype)
            .bind(ptype)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Check whether any role held by `user` grants `ptype` on `doctype`.
    pub async fn has_grant(&self, user: &str, doctype: &str, ptype: &str) -> Result<bool, DbError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT 1
            FROM user_roles ur
            JOIN role_permissions rp ON rp.role = ur.role
            WHERE ur.user_id = ? AND rp.doctype = ? AND rp.ptype = ?
            LIMIT 1
            "#,
        )
        .bind(user)
        .bind(doctype)
        .bind(ptype)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Check whether `user` holds a role that bypasses project scoping.
    pub async fn is_unrestricted(&self, user: &str) -> Result<bool, DbError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT 1
            FROM user_roles ur
            JOIN roles r ON r.name = ur.role
            WHERE ur.user_id = ? AND r.unrestricted = 1
            LIMIT 1
            "#,
        )
        .bind(user)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Resolve the project a document belongs to.
    ///
    /// Returns `Ok(None)` for documents that exist but are not project
    /// scoped, and [`DbError::NotFound`] when the document is missing.
    pub async fn document_project(&self, doctype: &str, name: &str) -> Result<Option<String>, DbError> {
        let query = match doctype {
            doctype::PROJECTS => "SELECT name FROM projects WHERE name = ?",
            doctype::PROJECT_MESSAGE => "SELECT project FROM project_messages WHERE name = ?",
            doctype::PROCUREMENT_ORDERS => "SELECT project FROM procurement_orders WHERE name = ?",
            doctype::PROCUREMENT_REQUESTS => {
                "SELECT project FROM procurement_requests WHERE name = ?"
            }
            doctype::FILE => "SELECT NULL FROM files WHERE name = ?",
            doctype::NIRMAAN_ATTACHMENTS => "SELECT NULL FROM nirmaan_attachments WHERE name = ?",
            other => return Err(DbError::Internal(format!("unsupported doctype: {other}"))),
        };

        let row: Option<(Option<String>,)> = sqlx::query_as(query)
            .bind(name)
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some((project,)) => Ok(project),
            None => Err(DbError::NotFound {
                doctype: doctype.to_string(),
                name: name.to_string(),
            }),
        }
    }
}
