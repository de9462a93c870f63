//! User repository.
//!
//! Handles user records, API credentials and display-name lookups.

use super::{DbError, now_nanos, placeholders};
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Stored API credentials for a user.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: String,
    pub enabled: bool,
    /// Argon2 PHC string; `None` if the user has no API access.
    pub api_secret_hash: Option<String>,
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user or update its profile and credentials.
    pub async fn upsert(
        &self,
        id: &str,
        full_name: Option<&str>,
        api_key: Option<&str>,
        api_secret_hash: Option<&str>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, full_name, enabled, api_key, api_secret_hash, creation)
            VALUES (?, ?, 1, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                full_name = excluded.full_name,
                api_key = excluded.api_key,
                api_secret_hash = excluded.api_secret_hash
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(api_key)
        .bind(api_secret_hash)
        .bind(now_nanos())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Enable or disable a user.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE users SET enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::UserNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Look up credentials by API key.
    pub async fn credentials_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<UserCredentials>, DbError> {
        let row: Option<(String, bool, Option<String>)> = sqlx::query_as(
            "SELECT id, enabled, api_secret_hash FROM users WHERE api_key = ?",
        )
        .bind(api_key)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(user_id, enabled, api_secret_hash)| UserCredentials {
            user_id,
            enabled,
            api_secret_hash,
        }))
    }

    /// Resolve full names for a batch of user ids.
    ///
    /// Users without a stored full name are absent from the result.
    pub async fn full_names(&self, ids: &[String]) -> Result<HashMap<String, String>, DbError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = format!(
            "SELECT id, full_name FROM users WHERE full_name IS NOT NULL AND full_name != '' AND id IN ({})",
            placeholders(ids.len())
        );
        let mut q = sqlx::query_as::<_, (String, String)>(&query);
        for id in ids {
            q = q.bind(id);
        }

        let rows = q.fetch_all(self.pool).await?;
        Ok(rows.into_iter().collect())
    }

    /// Replace the roles held by a user.
    pub async fn set_roles(&self, user_id: &str, roles: &[String]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for role in roles {
            sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?, ?)")
                .bind(user_id)
                .bind(role)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[tokio::test]
    async fn full_names_skips_unknown_and_blank() {
        let db = Database::new(":memory:").await.unwrap();
        db.users().upsert("alice", Some("Alice Rao"), None, None).await.unwrap();
        db.users().upsert("bob", Some(""), None, None).await.unwrap();

        let names = db
            .users()
            .full_names(&["alice".into(), "bob".into(), "carol".into()])
            .await
            .unwrap();

        assert_eq!(names.len(), 1);
        assert_eq!(names.get("alice").map(String::as_str), Some("Alice Rao"));
    }

    #[tokio::test]
    async fn credentials_lookup_by_key() {
        let db = Database::new(":memory:").await.unwrap();
        db.users()
            .upsert("alice", None, Some("key-a"), Some("$argon2id$stub"))
            .await
            .unwrap();

        let creds = db.users().credentials_by_api_key("key-a").await.unwrap().unwrap();
        assert_eq!(creds.user_id, "alice");
        assert!(creds.enabled);
        assert_eq!(creds.api_secret_hash.as_deref(), Some("$argon2id$stub"));

        db.users().set_enabled("alice", false).await.unwrap();
        let creds = db.users().credentials_by_api_key("key-a").await.unwrap().unwrap();
        assert!(!creds.enabled);

        assert!(db.users().credentials_by_api_key("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_enabled_unknown_user_fails() {
        let db = Database::new(":memory:").await.unwrap();
        let err = db.users().set_enabled("ghost", true).await.unwrap_err();
        assert!(matches!(err, crate::db::DbError::UserNotFound(_)));
    }
}
