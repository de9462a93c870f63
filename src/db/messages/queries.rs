//! Read path for project messages.
//!
//! Both queries return joined rows ordered newest first. The trailing
//! `name` and `idx` keys keep the order stable when timestamps collide.

use super::types::RawMessageRow;
use crate::db::DbError;
use sqlx::SqlitePool;

/// Window over joined rows: `LIMIT`/`OFFSET` count message-attachment rows.
pub(super) async fn fetch_rows(
    pool: &SqlitePool,
    project: &str,
    offset: u32,
    limit: u32,
) -> Result<Vec<RawMessageRow>, DbError> {
    let rows: Vec<RawMessageRow> = sqlx::query_as(
        r#"
        SELECT m.name AS message_id,
               m.owner AS author_id,
               m.message_content AS content,
               m.timestamp AS timestamp,
               m.creation AS creation,
               a.file AS attachment_id
        FROM project_messages m
        LEFT JOIN project_message_attachments a ON a.parent = m.name
        WHERE m.project = ?
        ORDER BY m.timestamp DESC, m.creation DESC, m.name DESC, a.idx ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(project)
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Window over parent messages: `LIMIT`/`OFFSET` count messages, and every
/// attachment row of the selected messages is returned.
pub(super) async fn fetch_rows_by_message(
    pool: &SqlitePool,
    project: &str,
    offset: u32,
    limit: u32,
) -> Result<Vec<RawMessageRow>, DbError> {
    let rows: Vec<RawMessageRow> = sqlx::query_as(
        r#"
        SELECT m.name AS message_id,
               m.owner AS author_id,
               m.message_content AS content,
               m.timestamp AS timestamp,
               m.creation AS creation,
               a.file AS attachment_id
        FROM (
            SELECT name, owner, message_content, timestamp, creation
            FROM project_messages
            WHERE project = ?
            ORDER BY timestamp DESC, creation DESC, name DESC
            LIMIT ? OFFSET ?
        ) m
        LEFT JOIN project_message_attachments a ON a.parent = m.name
        ORDER BY m.timestamp DESC, m.creation DESC, m.name DESC, a.idx ASC
        "#,
    )
    .bind(project)
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
