//! Procurement endpoints.

use super::args::{DeletePoArgs, body};
use super::{Caller, DELETE_CUSTOM_PO, Envelope, dispatch};
use crate::error::ServiceError;
use crate::procurement::DeletePoResponse;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

/// Always answers 200; the outcome is in the body's `status`.
pub async fn delete_custom_po(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<DeletePoArgs>, JsonRejection>,
) -> Result<Json<Envelope<DeletePoResponse>>, ServiceError> {
    dispatch(DELETE_CUSTOM_PO, &caller, async {
        let result = match body(payload) {
            Ok(args) => state.procurement.delete_custom_po(&caller, &args.po_id).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            crate::metrics::record_request_error(DELETE_CUSTOM_PO, e.error_code());
        }
        Ok(DeletePoResponse::from_result(&result))
    })
    .await
}
