//! Procurement order deletion.
//!
//! A custom procurement order is deleted together with the procurement
//! request it was raised from and every attachment filed against that
//! request, all in one transaction.

use crate::db::{Database, DbError, DeletedProcurement};
use crate::doctype;
use crate::error::ServiceError;
use crate::security::{AccessError, AccessPolicy, CallerContext, Ptype};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

pub const DELETED_MESSAGE: &str =
    "Procurement Order and associated Procurement Request deleted successfully.";

/// Response body for `delete_custom_po`. Failures are reported in the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DeletePoResponse {
    Deleted { message: &'static str, status: u16 },
    Failed { error: String, status: u16 },
}

impl DeletePoResponse {
    pub fn from_result(result: &Result<DeletedProcurement, ServiceError>) -> Self {
        match result {
            Ok(_) => Self::Deleted {
                message: DELETED_MESSAGE,
                status: 200,
            },
            Err(e) => Self::Failed {
                error: format!("Failed to delete Procurement Order and/or Procurement Request: {e}"),
                status: 400,
            },
        }
    }
}

pub struct ProcurementService {
    db: Database,
    policy: Arc<dyn AccessPolicy>,
}

impl ProcurementService {
    pub fn new(db: Database, policy: Arc<dyn AccessPolicy>) -> Self {
        Self { db, policy }
    }

    /// Delete a procurement order, its request and the request's attachments.
    pub async fn delete_custom_po(
        &self,
        caller: &CallerContext,
        po_id: &str,
    ) -> Result<DeletedProcurement, ServiceError> {
        let result = self.delete(caller, po_id).await;
        if let Err(e) = &result {
            error!(po = %po_id, user = %caller.user_id(), error = %e, "delete_custom_po failed");
        }
        result
    }

    async fn delete(
        &self,
        caller: &CallerContext,
        po_id: &str,
    ) -> Result<DeletedProcurement, ServiceError> {
        if po_id.is_empty() {
            return Err(ServiceError::invalid("po_id must be a non-empty string."));
        }
        if caller.is_guest() {
            return Err(ServiceError::denied("You must be logged in to delete procurement orders."));
        }
        let user = caller.user_id();

        self.require_delete(user, doctype::PROCUREMENT_ORDERS, po_id)
            .await?;

        let order = match self.db.procurement().get_order(po_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return Err(not_found(doctype::PROCUREMENT_ORDERS, po_id)),
            Err(e) => return Err(storage_error(e)),
        };

        self.require_delete(user, doctype::PROCUREMENT_REQUESTS, &order.procurement_request)
            .await?;

        let deleted = self
            .db
            .procurement()
            .delete_order_with_request(&order.name, &order.procurement_request)
            .await
            .map_err(|e| match e {
                DbError::NotFound { doctype, name } => not_found(&doctype, &name),
                other => storage_error(other),
            })?;

        info!(
            po = %order.name,
            pr = %order.procurement_request,
            project = %order.project,
            user = %user,
            attachments = deleted.attachments_removed,
            "Procurement order and request deleted"
        );
        Ok(deleted)
    }

    async fn require_delete(&self, user: &str, doctype: &str, name: &str) -> Result<(), ServiceError> {
        match self
            .policy
            .has_permission(user, doctype, Ptype::Delete, Some(name))
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::warn!(target: "security", user = %user, doctype = %doctype, name = %name, "delete denied");
                Err(ServiceError::denied(format!(
                    "User does not have permission to delete {doctype} {name}."
                )))
            }
            Err(AccessError::DocumentNotFound { doctype, name }) => Err(not_found(&doctype, &name)),
            Err(e) => Err(e.into()),
        }
    }
}

/// `"Procurement Orders"` → `"Procurement Order PO-1 not found."`
fn not_found(doctype: &str, name: &str) -> ServiceError {
    let singular = doctype.strip_suffix('s').unwrap_or(doctype);
    ServiceError::NotFound(format!("{singular} {name} not found."))
}

fn storage_error(e: DbError) -> ServiceError {
    error!(error = %e, "procurement storage error");
    ServiceError::internal("A database error occurred.")
}
