//! Project chat.
//!
//! History reads go through the [`pagination::Paginator`], which only knows
//! the three collaborator traits below. The SQL implementations live in
//! [`sql`]; [`service::ChatService`] adds access checks, sending and typing.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

pub mod pagination;
pub mod service;
pub mod sql;
pub mod types;

pub use pagination::ResolvedAttachment;
pub use service::{ChatService, TypingStatus};
pub use types::{AttachmentRef, MessagesPage, ProjectMessage};

use crate::db::RawMessageRow;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("store error: {0}")]
    Backend(String),
}

impl From<crate::db::DbError> for SourceError {
    fn from(err: crate::db::DbError) -> Self {
        match err {
            crate::db::DbError::NotFound { doctype, name } => {
                Self::NotFound(format!("{doctype} {name}"))
            }
            other => Self::Backend(other.to_string()),
        }
    }
}

/// What the offset and limit of a [`RowWindow`] count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowUnit {
    /// Raw joined rows; a message with N attachments spends N rows.
    #[default]
    RawRows,
    /// Parent messages; every attachment row of a windowed message is returned.
    Messages,
}

/// Slice of a conversation requested from a [`MessageSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWindow {
    pub offset: u32,
    pub limit: u32,
    pub unit: WindowUnit,
}

/// Raw rows for a conversation, newest first.
///
/// Rows are ordered by `timestamp DESC, creation DESC`; a message with
/// several attachments appears once per attachment.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_rows(
        &self,
        conversation: &str,
        window: RowWindow,
    ) -> Result<Vec<RawMessageRow>, SourceError>;
}

/// Batch lookup of attachment metadata. Unknown ids are absent from the map.
#[async_trait]
pub trait AttachmentResolver: Send + Sync {
    async fn resolve_many(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, ResolvedAttachment>, SourceError>;
}

/// Batch lookup of user display names. Unknown ids are absent from the map.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn display_names(&self, ids: &[String]) -> Result<HashMap<String, String>, SourceError>;

    /// Display name for one user, falling back to the id itself.
    async fn display_name(&self, id: &str) -> String {
        let ids = [id.to_string()];
        match self.display_names(&ids).await {
            Ok(mut names) => names.remove(id).unwrap_or_else(|| id.to_string()),
            Err(e) => {
                tracing::warn!(user = %id, error = %e, "display name lookup failed");
                id.to_string()
            }
        }
    }
}
