//! Procurement order/request repository.

use super::DbError;
use crate::doctype;
use sqlx::SqlitePool;

/// A procurement order and the request it was raised from.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ProcurementOrder {
    pub name: String,
    pub procurement_request: String,
    pub project: String,
}

/// Outcome of deleting an order/request pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletedProcurement {
    pub attachments_removed: u64,
}

/// Repository for procurement documents.
pub struct ProcurementRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProcurementRepository<'a> {
    /// Create a new procurement repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch a procurement order by name.
    pub async fn get_order(&self, name: &str) -> Result<Option<ProcurementOrder>, DbError> {
        let order: Option<ProcurementOrder> = sqlx::query_as(
            "SELECT name, procurement_request, project FROM procurement_orders WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Delete an order, its request and every attachment filed against the request.
    ///
    /// Runs in one transaction: either all rows go or none do.
    pub async fn delete_order_with_request(
        &self,
        order: &str,
        request: &str,
    ) -> Result<DeletedProcurement, DbError> {
        let mut tx = self.pool.begin().await?;

        let attachments = sqlx::query(
            r#"
            DELETE FROM nirmaan_attachments
            WHERE associated_doctype = ? AND associated_docname = ?
            "#,
        )
        .bind(doctype::PROCUREMENT_REQUESTS)
        .bind(request)
        .execute(&mut *tx)
        .await?;

        let orders = sqlx::query("DELETE FROM procurement_orders WHERE name = ?")
            .bind(order)
            .execute(&mut *tx)
            .await?;
        if orders.rows_affected() == 0 {
            return Err(DbError::NotFound {
                doctype: doctype::PROCUREMENT_ORDERS.to_string(),
                name: order.to_string(),
            });
        }

        let requests = sqlx::query("DELETE FROM procurement_requests WHERE name = ?")
            .bind(request)
            .execute(&mut *tx)
            .await?;
        if requests.rows_affected() == 0 {
            return Err(DbError::NotFound {
                doctype: doctype::PROCUREMENT_REQUESTS.to_string(),
                name: request.to_string(),
            });
        }

        tx.commit().await?;

        Ok(DeletedProcurement {
            attachments_removed: attachments.rows_affected(),
        })
    }
}
