//! Shared application state.
//!
//! One [`AppState`] is built at startup and cloned into every request
//! handler. It owns the database handle, the permission policy, the
//! realtime hub and the services composed from them.

use crate::chat::ChatService;
use crate::config::Config;
use crate::db::Database;
use crate::procurement::ProcurementService;
use crate::realtime::RealtimeHub;
use crate::security::{AccessPolicy, DbAccessPolicy};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub policy: Arc<dyn AccessPolicy>,
    pub hub: Arc<RealtimeHub>,
    pub chat: Arc<ChatService>,
    pub procurement: Arc<ProcurementService>,
}

impl AppState {
    pub fn new(db: Database, config: &Config) -> Self {
        let policy: Arc<dyn AccessPolicy> = Arc::new(DbAccessPolicy::new(db.clone()));
        let hub = Arc::new(RealtimeHub::new(config.realtime.channel_capacity));
        let chat = Arc::new(ChatService::new(
            db.clone(),
            policy.clone(),
            hub.clone(),
            &config.chat,
        ));
        let procurement = Arc::new(ProcurementService::new(db.clone(), policy.clone()));

        Self {
            db,
            policy,
            hub,
            chat,
            procurement,
        }
    }
}
