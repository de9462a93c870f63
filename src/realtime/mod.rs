//! In-process realtime rooms.
//!
//! A room is a `tokio::sync::broadcast` channel keyed by name. Clients
//! viewing a document subscribe to its room (`doc:<doctype>/<name>`);
//! services publish named events with a JSON payload. Publishing never
//! blocks: a subscriber that falls behind by more than the channel
//! capacity skips the missed events.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One published event, payload already serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeEvent {
    pub event: String,
    pub data: String,
}

pub struct RealtimeHub {
    rooms: DashMap<String, broadcast::Sender<Arc<RealtimeEvent>>>,
    capacity: usize,
}

impl RealtimeHub {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Room name for a document.
    pub fn doc_room(doctype: &str, name: &str) -> String {
        format!("doc:{doctype}/{name}")
    }

    /// Subscribe to a room, creating it if needed.
    pub fn subscribe(&self, room: &str) -> broadcast::Receiver<Arc<RealtimeEvent>> {
        if let Some(tx) = self.rooms.get(room) {
            return tx.subscribe();
        }
        self.rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish `event` to `room`. Returns how many subscribers received it.
    ///
    /// A room without subscribers is not an error.
    pub fn publish<T: Serialize + ?Sized>(
        &self,
        room: &str,
        event: &str,
        payload: &T,
    ) -> Result<usize, RealtimeError> {
        let data = serde_json::to_string(payload)?;
        crate::metrics::record_realtime_event(event);

        let Some(tx) = self.rooms.get(room) else {
            debug!(target: "realtime", room = %room, event = %event, "no subscribers");
            return Ok(0);
        };

        let delivered = tx
            .send(Arc::new(RealtimeEvent {
                event: event.to_string(),
                data,
            }))
            .unwrap_or(0);

        debug!(target: "realtime", room = %room, event = %event, delivered, "published");
        Ok(delivered)
    }

    /// Drop rooms nobody listens to. Returns how many were removed.
    pub fn prune_idle(&self) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|_, tx| tx.receiver_count() > 0);
        let removed = before.saturating_sub(self.rooms.len());
        if removed > 0 {
            debug!(target: "realtime", removed, "pruned idle rooms");
        }
        removed
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn doc_room_format() {
        assert_eq!(RealtimeHub::doc_room("Projects", "PROJ-1"), "doc:Projects/PROJ-1");
    }

    #[tokio::test]
    async fn publish_reaches_subscribers() {
        let hub = RealtimeHub::default();
        let room = RealtimeHub::doc_room("Projects", "PROJ-1");
        let mut a = hub.subscribe(&room);
        let mut b = hub.subscribe(&room);

        let n = hub
            .publish(&room, "new_project_message", &json!({"name": "m1"}))
            .unwrap();
        assert_eq!(n, 2);

        let got = a.recv().await.unwrap();
        assert_eq!(got.event, "new_project_message");
        assert_eq!(got.data, r#"{"name":"m1"}"#);
        assert_eq!(b.recv().await.unwrap(), got);
    }

    #[test]
    fn publish_without_room_is_ok() {
        let hub = RealtimeHub::default();
        assert_eq!(hub.publish("doc:Projects/none", "x", &json!({})).unwrap(), 0);
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn prune_drops_rooms_without_receivers() {
        let hub = RealtimeHub::default();
        let kept = hub.subscribe("doc:Projects/A");
        drop(hub.subscribe("doc:Projects/B"));

        assert_eq!(hub.room_count(), 2);
        assert_eq!(hub.prune_idle(), 1);
        assert_eq!(hub.room_count(), 1);
        drop(kept);
        assert_eq!(hub.prune_idle(), 1);
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let hub = RealtimeHub::new(2);
        let mut rx = hub.subscribe("r");
        for i in 0..5 {
            hub.publish("r", "tick", &i).unwrap();
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(rx.recv().await.unwrap().data, "3");
    }
}
