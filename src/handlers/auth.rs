//! Request authentication.
//!
//! `Authorization: token <api_key>:<api_secret>` identifies a user. A
//! request without the header runs as Guest; a header that does not check
//! out is rejected with 401.

use crate::db::Database;
use crate::error::ServiceError;
use crate::security::{CallerContext, secret};
use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::{debug, error, warn};

const INVALID_CREDENTIALS: &str = "Invalid API credentials.";

/// Extractor yielding the [`CallerContext`] for a request.
pub struct Caller(pub CallerContext);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Caller(CallerContext::guest()));
        };

        let header = value.to_str().map_err(|_| auth_failed())?;
        let (key, secret) = parse_token(header).ok_or_else(auth_failed)?;
        authenticate(&state.db, key, secret).await.map(Caller)
    }
}

fn auth_failed() -> ServiceError {
    ServiceError::AuthenticationFailed(INVALID_CREDENTIALS.to_string())
}

/// Split `token key:secret` into its parts.
pub fn parse_token(header: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("token") {
        return None;
    }
    let (key, secret) = rest.trim().split_once(':')?;
    if key.is_empty() || secret.is_empty() {
        return None;
    }
    Some((key, secret))
}

/// Check an API key/secret pair. Argon2 runs on the blocking pool.
pub async fn authenticate(db: &Database, key: &str, secret: &str) -> Result<CallerContext, ServiceError> {
    let creds = match db.users().credentials_by_api_key(key).await {
        Ok(Some(creds)) => creds,
        Ok(None) => {
            debug!(target: "security", "unknown api key");
            return Err(auth_failed());
        }
        Err(e) => {
            error!(error = %e, "credential lookup failed");
            return Err(ServiceError::internal("An error occurred during authentication."));
        }
    };

    if !creds.enabled {
        warn!(target: "security", user = %creds.user_id, "disabled user attempted to authenticate");
        return Err(auth_failed());
    }
    let Some(hash) = creds.api_secret_hash else {
        return Err(auth_failed());
    };

    let candidate = secret.to_string();
    let verified = tokio::task::spawn_blocking(move || secret::verify_secret(&candidate, &hash)).await;

    match verified {
        Ok(Ok(true)) => Ok(CallerContext::user(creds.user_id)),
        Ok(Ok(false)) => {
            warn!(target: "security", user = %creds.user_id, "api secret mismatch");
            Err(auth_failed())
        }
        Ok(Err(e)) => {
            warn!(target: "security", user = %creds.user_id, error = %e, "stored api secret hash is unreadable");
            Err(auth_failed())
        }
        Err(e) => {
            error!(error = %e, "secret verification task failed");
            Err(ServiceError::internal("An error occurred during authentication."))
        }
    }
}
