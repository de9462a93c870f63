//! SQLite-backed chat collaborators.

use super::pagination::ResolvedAttachment;
use super::{AttachmentResolver, IdentityResolver, MessageSource, RowWindow, SourceError, WindowUnit};
use crate::db::{Database, RawMessageRow};
use crate::doctype;
use async_trait::async_trait;
use std::collections::HashMap;

/// Message store, file resolver and name resolver over one [`Database`].
#[derive(Clone)]
pub struct SqlChatStore {
    db: Database,
}

impl SqlChatStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageSource for SqlChatStore {
    async fn fetch_rows(
        &self,
        conversation: &str,
        window: RowWindow,
    ) -> Result<Vec<RawMessageRow>, SourceError> {
        let messages = self.db.messages();
        let rows = match window.unit {
            WindowUnit::RawRows => {
                messages
                    .fetch_rows(conversation, window.offset, window.limit)
                    .await?
            }
            WindowUnit::Messages => {
                messages
                    .fetch_rows_by_message(conversation, window.offset, window.limit)
                    .await?
            }
        };

        // An empty page is only distinguishable from a missing project here
        if rows.is_empty() && !self.db.projects().exists(conversation).await? {
            return Err(SourceError::NotFound(format!(
                "{} {}",
                doctype::PROJECTS,
                conversation
            )));
        }

        Ok(rows)
    }
}

#[async_trait]
impl AttachmentResolver for SqlChatStore {
    async fn resolve_many(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, ResolvedAttachment>, SourceError> {
        let files = self.db.files().resolve_many(ids).await?;
        Ok(files
            .into_iter()
            .map(|(name, f)| {
                let resolved = ResolvedAttachment {
                    id: name.clone(),
                    display_name: f.file_name,
                    url: f.file_url,
                    is_private: f.is_private,
                };
                (name, resolved)
            })
            .collect())
    }
}

#[async_trait]
impl IdentityResolver for SqlChatStore {
    async fn display_names(&self, ids: &[String]) -> Result<HashMap<String, String>, SourceError> {
        Ok(self.db.users().full_names(ids).await?)
    }
}
