//! Server-Sent Events stream of a document room.

use super::Caller;
use crate::error::ServiceError;
use crate::realtime::{RealtimeEvent, RealtimeHub};
use crate::security::{AccessError, Ptype};
use crate::state::AppState;
use crate::telemetry::spans;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

/// Decrements the subscriber gauge when the stream is dropped.
struct SubscriberGuard {
    room: String,
    user: String,
}

impl SubscriberGuard {
    fn new(room: String, user: String) -> Self {
        crate::metrics::add_realtime_subscribers(1);
        Self { room, user }
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        crate::metrics::add_realtime_subscribers(-1);
        info!(target: "realtime", room = %self.room, user = %self.user, "stream closed");
    }
}

pub async fn stream(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path((doctype, name)): Path<(String, String)>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServiceError> {
    if caller.is_guest() {
        return Err(ServiceError::denied("You must be logged in to subscribe."));
    }
    let user = caller.user_id().to_string();

    let allowed = match state
        .policy
        .has_permission(&user, &doctype, Ptype::Read, Some(name.as_str()))
        .await
    {
        Ok(allowed) => allowed,
        Err(AccessError::DocumentNotFound { doctype, name }) => {
            return Err(ServiceError::NotFound(format!("{doctype} {name} not found.")));
        }
        Err(e) => return Err(e.into()),
    };
    if !allowed {
        warn!(target: "security", user = %user, doctype = %doctype, name = %name, "subscription denied");
        return Err(ServiceError::denied(format!(
            "User does not have read access to {doctype} {name}."
        )));
    }

    let room = RealtimeHub::doc_room(&doctype, &name);
    let rx = state.hub.subscribe(&room);
    let span = spans::stream(&room, &user);
    span.in_scope(|| info!(target: "realtime", "stream opened"));
    let guard = SubscriberGuard::new(room, user);

    Ok(Sse::new(events(rx, guard)).keep_alive(KeepAlive::default()))
}

fn events(
    rx: broadcast::Receiver<Arc<RealtimeEvent>>,
    guard: SubscriberGuard,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold((rx, guard), |(mut rx, guard)| async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    let event = Event::default().event(ev.event.as_str()).data(ev.data.as_str());
                    return Some((Ok(event), (rx, guard)));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "realtime", room = %guard.room, user = %guard.user, skipped, "subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}
