//! Project discussion message storage.
//!
//! # Architecture
//! - Parent rows in `project_messages`, one child row per attachment in
//!   `project_message_attachments`
//! - Nanosecond `timestamp` (primary order) and `creation` (tie-break)
//! - Reads return the raw parent/attachment join; grouping happens in
//!   [`crate::chat::pagination`]

mod queries;
mod storage;
mod types;

pub use types::{NewMessageRecord, RawMessageRow};

use crate::db::DbError;
use sqlx::SqlitePool;

/// Repository for project message storage and retrieval.
pub struct MessageRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MessageRepository<'a> {
    /// Create a new message repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a message together with its attachment rows.
    pub async fn insert_message(&self, record: &NewMessageRecord<'_>) -> Result<(), DbError> {
        storage::insert_message(self.pool, record).await
    }

    /// Fetch joined rows, windowed by row count.
    pub async fn fetch_rows(
        &self,
        project: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<RawMessageRow>, DbError> {
        queries::fetch_rows(self.pool, project, offset, limit).await
    }

    /// Fetch joined rows, windowed by message count.
    pub async fn fetch_rows_by_message(
        &self,
        project: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<RawMessageRow>, DbError> {
        queries::fetch_rows_by_message(self.pool, project, offset, limit).await
    }
}
