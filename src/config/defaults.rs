//! Default value functions for configuration.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_metrics_port() -> Option<u16> {
    Some(9090)
}

pub fn default_database_path() -> String {
    "data/nirmaan.db".to_string()
}

// =============================================================================
// Chat Defaults
// =============================================================================

pub fn default_page_size() -> u32 {
    50
}

pub fn default_max_page_size() -> u32 {
    500
}

pub fn default_typing_rate() -> u32 {
    5
}

pub fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

// =============================================================================
// Realtime Defaults
// =============================================================================

pub fn default_channel_capacity() -> usize {
    256
}

pub fn default_prune_interval() -> u64 {
    300
}
