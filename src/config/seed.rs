//! Role, user and project blocks, upserted into the database at startup.

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::Config;
use super::defaults::default_true;
use crate::db::{Database, DbError};
use crate::security::secret;

/// Role block: a named role and the permissions it grants.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleBlock {
    pub name: String,
    /// Holders bypass project-membership scoping.
    #[serde(default)]
    pub unrestricted: bool,
    #[serde(default)]
    pub grants: Vec<GrantBlock>,
}

/// Permission types granted on one doctype.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantBlock {
    pub doctype: String,
    pub ptypes: Vec<String>,
}

/// API user block.
#[derive(Debug, Clone, Deserialize)]
pub struct UserBlock {
    /// User id (usually the email address).
    pub id: String,
    pub full_name: Option<String>,
    /// Public half of the `Authorization: token key:secret` pair.
    pub api_key: Option<String>,
    /// Plaintext secret (hashed when seeded) or an `$argon2` PHC string.
    pub api_secret: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Project block.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectBlock {
    pub name: String,
    pub project_name: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("failed to hash api_secret for user {user}: {reason}")]
    Hash { user: String, reason: String },
}

/// Upsert every seed block. Safe to run on each start.
pub async fn apply(db: &Database, config: &Config) -> Result<(), SeedError> {
    let perms = db.permissions();
    for role in &config.roles {
        perms.upsert_role(&role.name, role.unrestricted).await?;
        let grants: Vec<(String, String)> = role
            .grants
            .iter()
            .flat_map(|g| {
                g.ptypes
                    .iter()
                    .map(|p| (g.doctype.clone(), p.to_ascii_lowercase()))
            })
            .collect();
        perms.set_grants(&role.name, &grants).await?;
    }

    let users = db.users();
    for user in &config.users {
        let hash = match user.api_secret.as_deref() {
            Some(s) if secret::is_hashed(s) => Some(s.to_string()),
            Some(s) => Some(secret::hash_secret(s).map_err(|e| SeedError::Hash {
                user: user.id.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };
        users
            .upsert(
                &user.id,
                user.full_name.as_deref(),
                user.api_key.as_deref(),
                hash.as_deref(),
            )
            .await?;
        users.set_enabled(&user.id, user.enabled).await?;
        users.set_roles(&user.id, &user.roles).await?;
    }

    let projects = db.projects();
    for project in &config.projects {
        projects
            .upsert(&project.name, project.project_name.as_deref())
            .await?;
        for member in &project.members {
            projects.add_member(&project.name, member).await?;
        }
    }

    info!(
        roles = config.roles.len(),
        users = config.users.len(),
        projects = config.projects.len(),
        "Seed configuration applied"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doctype;

    fn config() -> Config {
        toml::from_str(
            r#"
[server]
name = "test"
listen = "127.0.0.1:0"

[[roles]]
name = "Site Engineer"
grants = [{ doctype = "Projects", ptypes = ["Read"] }]

[[users]]
id = "alice"
full_name = "Alice Rao"
api_key = "ak"
api_secret = "plain"
roles = ["Site Engineer"]

[[users]]
id = "off"
enabled = false

[[projects]]
name = "PROJ-1"
members = ["alice"]
"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn seed_is_applied_and_idempotent() {
        let db = Database::new(":memory:").await.unwrap();
        let config = config();

        apply(&db, &config).await.unwrap();
        apply(&db, &config).await.unwrap();

        assert!(db.permissions().has_grant("alice", doctype::PROJECTS, "read").await.unwrap());
        assert!(db.projects().is_member("PROJ-1", "alice").await.unwrap());

        let creds = db.users().credentials_by_api_key("ak").await.unwrap().unwrap();
        assert_eq!(creds.user_id, "alice");
        let stored = creds.api_secret_hash.unwrap();
        assert!(secret::is_hashed(&stored));
        assert!(secret::verify_secret("plain", &stored).unwrap());

        let names = db.users().full_names(&["alice".into(), "off".into()]).await.unwrap();
        assert_eq!(names.len(), 1);
    }
}
