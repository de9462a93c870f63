//! Type definitions for project message storage.

/// One row of the message/attachment join.
///
/// A message with N attachments yields N rows that repeat the parent
/// columns; a message without attachments yields one row with
/// `attachment_id = None`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RawMessageRow {
    pub message_id: String,
    pub author_id: String,
    pub content: Option<String>,
    /// Primary ordering key, nanoseconds.
    pub timestamp: i64,
    /// Tie-break ordering key, nanoseconds.
    pub creation: i64,
    pub attachment_id: Option<String>,
}

/// Parameters for storing a project message.
pub struct NewMessageRecord<'a> {
    pub name: &'a str,
    pub project: &'a str,
    pub owner: &'a str,
    pub message_content: Option<&'a str>,
    pub timestamp: i64,
    pub creation: i64,
    /// File names, in display order.
    pub attachment_files: &'a [String],
}
