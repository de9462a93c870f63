//! Request bodies.
//!
//! Clients send integers either as JSON numbers or as numeric strings, so
//! `limit` and `start` go through [`lenient_int`].

use crate::chat::AttachmentRef;
use crate::error::ServiceError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct GetMessagesArgs {
    #[serde(default)]
    pub project_name: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub start: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageArgs {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub message_content: Option<String>,
    #[serde(default)]
    pub attachments: Option<Value>,
}

impl SendMessageArgs {
    /// `[{"name": ..}, ..]`; anything but a list counts as no attachments.
    pub fn attachment_refs(&self) -> Option<Vec<AttachmentRef>> {
        let Some(Value::Array(items)) = &self.attachments else {
            return None;
        };
        Some(
            items
                .iter()
                .map(|item| AttachmentRef {
                    name: item
                        .get("name")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                })
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct TypingArgs {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub is_typing: Option<Value>,
}

impl TypingArgs {
    pub fn is_typing(&self) -> Option<bool> {
        self.is_typing.as_ref().and_then(Value::as_bool)
    }
}

#[derive(Debug, Deserialize)]
pub struct DeletePoArgs {
    #[serde(default)]
    pub po_id: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntLike {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Accept `5`, `5.0` or `"5"`; reject anything else.
fn lenient_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    match Option::<IntLike>::deserialize(d)? {
        None => Ok(None),
        Some(IntLike::Int(i)) => Ok(Some(i)),
        Some(IntLike::Float(f)) if f.fract() == 0.0 && f.is_finite() => Ok(Some(f as i64)),
        Some(IntLike::Float(f)) => Err(D::Error::custom(format!("expected an integer, got {f}"))),
        Some(IntLike::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, got {s:?}"))),
    }
}

/// Unwrap a JSON body, turning a rejection into a validation error.
pub fn body<T: DeserializeOwned>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(args)| args)
        .map_err(|e| ServiceError::invalid(e.body_text()))
}
