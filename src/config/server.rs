//! Room runtime configuration types.

use super::defaults::{
    default_create_attempts, default_inbox_capacity, default_room_code_length,
    default_session_queue_capacity, default_tick_interval_ms,
};
use serde::{Deserialize, Serialize};

/// Server configuration for the room runtime.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Broadcast tick period in milliseconds (50 ms = 20 Hz).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Length of generated room codes.
    #[serde(default = "default_room_code_length")]
    pub room_code_length: usize,
    /// Fresh codes tried before room creation surfaces a conflict.
    #[serde(default = "default_create_attempts")]
    pub create_attempts: usize,
    /// Depth of each room actor's command inbox.
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,
    /// Outbound frame queue depth per WebSocket session.
    #[serde(default = "default_session_queue_capacity")]
    pub session_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            room_code_length: default_room_code_length(),
            create_attempts: default_create_attempts(),
            inbox_capacity: default_inbox_capacity(),
            session_queue_capacity: default_session_queue_capacity(),
        }
    }
}
