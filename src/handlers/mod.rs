//! HTTP API handlers.
//!
//! Method paths mirror the dotted names the web frontend already calls
//! (`/api/method/<module>.<function>`). Every successful call answers
//! `{"message": <payload>}`; failures answer `{"exc_type", "message"}` with
//! the status from [`ServiceError::status`].

mod args;
pub mod auth;
mod chat;
mod procurement;
mod realtime;

use crate::error::ServiceError;
use crate::security::CallerContext;
use crate::state::AppState;
use crate::telemetry::{RequestTimer, spans};
use axum::Json;
use axum::Router;
use axum::routing::{get, post};
use serde::Serialize;
use serde_json::{Value, json};
use std::future::Future;
use tracing::Instrument;

pub use auth::Caller;

pub const GET_PROJECT_MESSAGES: &str =
    "nirmaan_stack.api.projects.project_chat.get_project_messages";
pub const SEND_PROJECT_MESSAGE: &str =
    "nirmaan_stack.api.projects.project_chat.send_project_message";
pub const UPDATE_TYPING_STATUS: &str =
    "nirmaan_stack.api.projects.project_chat.update_typing_status";
pub const DELETE_CUSTOM_PO: &str = "nirmaan_stack.api.delete_custom_po_and_pr.delete_custom_po";

/// Framework-style success envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: T,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(&method_path(GET_PROJECT_MESSAGES), post(chat::get_project_messages))
        .route(&method_path(SEND_PROJECT_MESSAGE), post(chat::send_project_message))
        .route(&method_path(UPDATE_TYPING_STATUS), post(chat::update_typing_status))
        .route(&method_path(DELETE_CUSTOM_PO), post(procurement::delete_custom_po))
        .route("/api/realtime/:doctype/:name", get(realtime::stream))
        .route("/api/health", get(health))
        .with_state(state)
}

fn method_path(method: &str) -> String {
    format!("/api/method/{method}")
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Run one API call inside its span, recording latency and error codes.
async fn dispatch<T, F>(
    method: &'static str,
    caller: &CallerContext,
    call: F,
) -> Result<Json<Envelope<T>>, ServiceError>
where
    T: Serialize,
    F: Future<Output = Result<T, ServiceError>>,
{
    let timer = RequestTimer::new(method);
    let result = call.instrument(spans::request(method, caller.user_id())).await;
    match result {
        Ok(message) => Ok(Json(Envelope { message })),
        Err(e) => {
            timer.fail(e.error_code());
            Err(e)
        }
    }
}
