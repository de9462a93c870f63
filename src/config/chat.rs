//! Project chat configuration.

use serde::Deserialize;

use super::defaults::{
    default_max_page_size, default_page_size, default_timestamp_format, default_typing_rate,
};
use crate::chat::WindowUnit;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Page size used when a caller sends `limit <= 0` or none.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Upper bound on `limit`.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// `"raw-rows"` (default) or `"messages"`.
    #[serde(default)]
    pub pagination: WindowUnit,
    /// Typing broadcasts allowed per (user, project) per second.
    #[serde(default = "default_typing_rate")]
    pub typing_rate_per_second: u32,
    /// `chrono` format string for wire timestamps (UTC).
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            pagination: WindowUnit::default(),
            typing_rate_per_second: default_typing_rate(),
            timestamp_format: default_timestamp_format(),
        }
    }
}
