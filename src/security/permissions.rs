//! Document permission checks.
//!
//! A user may act on a doctype when one of their roles grants the
//! permission type. Checks against a specific document additionally
//! require the document to exist and, for project-scoped documents,
//! membership of that project unless the user holds an unrestricted role.

use super::caller::{ADMINISTRATOR, GUEST};
use crate::db::{Database, DbError};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Permission type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ptype {
    Read,
    Create,
    Delete,
}

impl Ptype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Ptype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ptype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown permission type: {other}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("{doctype} {name} not found")]
    DocumentNotFound { doctype: String, name: String },
    #[error("permission backend error: {0}")]
    Backend(String),
}

impl From<DbError> for AccessError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { doctype, name } => Self::DocumentNotFound { doctype, name },
            other => Self::Backend(other.to_string()),
        }
    }
}

#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Check whether `user` may perform `ptype` on `doctype`, optionally on one document.
    async fn has_permission(
        &self,
        user: &str,
        doctype: &str,
        ptype: Ptype,
        doc: Option<&str>,
    ) -> Result<bool, AccessError>;

    /// Whether `user` bypasses project scoping (and private-file ownership).
    async fn is_unrestricted(&self, user: &str) -> Result<bool, AccessError>;
}

/// [`AccessPolicy`] backed by the role and membership tables.
#[derive(Clone)]
pub struct DbAccessPolicy {
    db: Database,
}

impl DbAccessPolicy {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccessPolicy for DbAccessPolicy {
    async fn has_permission(
        &self,
        user: &str,
        doctype: &str,
        ptype: Ptype,
        doc: Option<&str>,
    ) -> Result<bool, AccessError> {
        if user == GUEST || user.is_empty() {
            return Ok(false);
        }

        let perms = self.db.permissions();

        let project = match doc {
            Some(name) => perms.document_project(doctype, name).await?,
            None => None,
        };

        if user == ADMINISTRATOR {
            return Ok(true);
        }

        if !perms.has_grant(user, doctype, ptype.as_str()).await? {
            tracing::debug!(user = %user, doctype = %doctype, ptype = %ptype, "no role grant");
            return Ok(false);
        }

        let Some(project) = project else {
            return Ok(true);
        };

        if perms.is_unrestricted(user).await? {
            return Ok(true);
        }

        Ok(self.db.projects().is_member(&project, user).await?)
    }

    async fn is_unrestricted(&self, user: &str) -> Result<bool, AccessError> {
        if user == ADMINISTRATOR {
            return Ok(true);
        }
        if user == GUEST {
            return Ok(false);
        }
        Ok(self.db.permissions().is_unrestricted(user).await?)
    }
}
