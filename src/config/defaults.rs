//! Default value functions for configuration fields, used by serde's
//! `#[serde(default = ...)]` attributes throughout the configuration
//! system.

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    8787
}

// =============================================================================
// Server Defaults
// =============================================================================

/// 20 Hz broadcast tick.
pub const fn default_tick_interval_ms() -> u64 {
    50
}

pub const fn default_room_code_length() -> usize {
    4
}

pub const fn default_create_attempts() -> usize {
    5
}

pub const fn default_inbox_capacity() -> usize {
    256
}

pub const fn default_session_queue_capacity() -> usize {
    64
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "*".to_string()
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Text
}
