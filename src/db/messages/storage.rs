//! Write path for project messages.

use super::types::NewMessageRecord;
use crate::db::DbError;
use sqlx::SqlitePool;

/// Insert a message and its attachment rows in one transaction.
pub(super) async fn insert_message(
    pool: &SqlitePool,
    record: &NewMessageRecord<'_>,
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO project_messages (name, project, owner, message_content, timestamp, creation)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.name)
    .bind(record.project)
    .bind(record.owner)
    .bind(record.message_content)
    .bind(record.timestamp)
    .bind(record.creation)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(message = %record.name, project = %record.project, "Failed to insert message: {}", e);
        e
    })?;

    for (idx, file) in record.attachment_files.iter().enumerate() {
        let row_name = format!("{}-{:02}", record.name, idx + 1);
        sqlx::query(
            r#"
            INSERT INTO project_message_attachments (name, parent, file, idx)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&row_name)
        .bind(record.name)
        .bind(file)
        .bind(idx as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
