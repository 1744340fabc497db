#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines
)]

//! # GameDock Server
//!
//! Multi-tenant real-time relay and session service for small game
//! clients: API-key tenancy, 4-character room codes, actor-per-room
//! WebSocket relay with 20 Hz state sync, host migration, hibernation,
//! per-player save storage, and per-game usage statistics.

/// API key resolution for the public plane, shared-secret gate for the
/// internal plane
pub mod auth;

/// Server configuration and environment variables
pub mod config;

/// HTTP/WebSocket transport adapter
pub mod http;

/// API key registry (admin plane CRUD)
pub mod keys;

/// Structured logging configuration
pub mod logging;

/// Process counters
pub mod metrics;

/// Wire protocol and core domain types
pub mod protocol;

/// Room registry and the actor-per-room runtime
pub mod room;

/// Per-player save storage
pub mod saves;

/// Per-game stats accumulator
pub mod stats;

/// Key/value storage abstraction
pub mod storage;
