//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions ([`Config`] and its sections)
//! - [`chat`]: Chat paging, typing throttle and timestamp format (ChatConfig)
//! - [`seed`]: Role, user and project blocks upserted at startup
//! - [`validation`]: Startup checks returning every problem found

mod chat;
mod defaults;
pub mod seed;
mod types;
pub mod validation;

pub use chat::ChatConfig;
pub use types::Config;
