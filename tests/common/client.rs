//! API client for integration tests.

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

pub const GET_PROJECT_MESSAGES: &str =
    "nirmaan_stack.api.projects.project_chat.get_project_messages";
pub const SEND_PROJECT_MESSAGE: &str =
    "nirmaan_stack.api.projects.project_chat.send_project_message";
pub const UPDATE_TYPING_STATUS: &str =
    "nirmaan_stack.api.projects.project_chat.update_typing_status";
pub const DELETE_CUSTOM_PO: &str = "nirmaan_stack.api.delete_custom_po_and_pr.delete_custom_po";

pub struct ApiClient {
    http: Client,
    base: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base: String, credentials: Option<(&str, &str)>) -> Self {
        Self {
            http: Client::new(),
            base,
            token: credentials.map(|(key, secret)| format!("token {key}:{secret}")),
        }
    }

    /// Call a whitelisted method. Returns the status and the decoded body.
    pub async fn call(&self, method: &str, args: Value) -> anyhow::Result<(StatusCode, Value)> {
        let mut req = self
            .http
            .post(format!("{}/api/method/{method}", self.base))
            .json(&args);
        if let Some(token) = &self.token {
            req = req.header("Authorization", token);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.json::<Value>().await?;
        Ok((status, body))
    }

    /// Call a method that must succeed; returns the `message` payload.
    pub async fn ok(&self, method: &str, args: Value) -> anyhow::Result<Value> {
        let (status, body) = self.call(method, args).await?;
        anyhow::ensure!(status.is_success(), "{method} failed with {status}: {body}");
        Ok(body["message"].clone())
    }

    /// Open the realtime stream for a document.
    pub async fn subscribe(&self, doctype: &str, name: &str) -> anyhow::Result<Response> {
        let mut req = self
            .http
            .get(format!("{}/api/realtime/{doctype}/{name}", self.base));
        if let Some(token) = &self.token {
            req = req.header("Authorization", token);
        }
        Ok(req.send().await?)
    }
}
