//! Chat message types: the insert-side record and the JSON wire shapes.

use super::pagination::{PageMessage, ResolvedAttachment};
use crate::db::{NewMessageRecord, now_nanos};
use crate::security::CallerContext;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A message about to be stored, with every implicit field filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProjectMessage {
    pub name: String,
    pub project: String,
    pub owner: String,
    pub message_content: Option<String>,
    pub timestamp: i64,
    pub creation: i64,
    pub attachments: Vec<String>,
}

impl NewProjectMessage {
    /// Build a message owned by `caller`, timestamped now.
    ///
    /// Empty content is stored as `None`.
    pub fn new(
        caller: &CallerContext,
        project: impl Into<String>,
        content: Option<String>,
        attachments: Vec<String>,
    ) -> Self {
        let now = now_nanos();
        Self {
            name: uuid::Uuid::new_v4().simple().to_string(),
            project: project.into(),
            owner: caller.user_id().to_string(),
            message_content: content.filter(|c| !c.is_empty()),
            timestamp: now,
            creation: now,
            attachments,
        }
    }

    pub fn as_record(&self) -> NewMessageRecord<'_> {
        NewMessageRecord {
            name: &self.name,
            project: &self.project,
            owner: &self.owner,
            message_content: self.message_content.as_deref(),
            timestamp: self.timestamp,
            creation: self.creation,
            attachment_files: &self.attachments,
        }
    }
}

/// `{"name": "<file id>"}` as sent by clients.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageAttachment {
    pub name: String,
    pub file_name: String,
    pub file_url: String,
    /// `0` or `1`.
    pub is_private: u8,
}

impl From<ResolvedAttachment> for MessageAttachment {
    fn from(a: ResolvedAttachment) -> Self {
        Self {
            name: a.id,
            file_name: a.display_name,
            file_url: a.url,
            is_private: u8::from(a.is_private),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectMessage {
    pub name: String,
    pub project: String,
    pub sender: String,
    pub message_content: Option<String>,
    pub timestamp: String,
    pub owner: String,
    pub sender_full_name: String,
    pub attachments: Vec<MessageAttachment>,
}

impl ProjectMessage {
    pub fn from_page_message(msg: PageMessage, timestamp_format: &str) -> Self {
        Self {
            timestamp: format_timestamp(msg.timestamp, timestamp_format),
            name: msg.id,
            project: msg.conversation,
            sender: msg.author_id.clone(),
            message_content: msg.content,
            owner: msg.author_id,
            sender_full_name: msg.sender_full_name,
            attachments: msg.attachments.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagesPage {
    pub messages: Vec<ProjectMessage>,
    pub has_more: bool,
}

/// Format nanoseconds since the epoch as UTC.
pub fn format_timestamp(nanos: i64, format: &str) -> String {
    Utc.timestamp_nanos(nanos).format(format).to_string()
}
