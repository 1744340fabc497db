use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters for the relay service. Incremented from the
/// transport adapter and room actors; read by the internal metrics
/// endpoint.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Connection metrics
    pub total_connections: AtomicU64,
    pub active_connections: AtomicU64,

    // Room lifecycle metrics
    pub rooms_created: AtomicU64,
    pub rooms_closed: AtomicU64,
    pub players_joined: AtomicU64,
    pub players_left: AtomicU64,
    pub hosts_migrated: AtomicU64,
    pub sessions_replaced: AtomicU64,

    // Relay metrics
    pub frames_relayed: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub malformed_frames: AtomicU64,

    // Persistence and stats metrics
    pub snapshot_failures: AtomicU64,
    pub stats_events: AtomicU64,
    pub stats_failures: AtomicU64,
}

/// Serializable point-in-time view for the internal metrics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsView {
    pub total_connections: u64,
    pub active_connections: u64,
    pub rooms_created: u64,
    pub rooms_closed: u64,
    pub players_joined: u64,
    pub players_left: u64,
    pub hosts_migrated: u64,
    pub sessions_replaced: u64,
    pub frames_relayed: u64,
    pub frames_dropped: u64,
    pub malformed_frames: u64,
    pub snapshot_failures: u64,
    pub stats_events: u64,
    pub stats_failures: u64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_total_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            });
    }

    pub fn increment_rooms_created(&self) {
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_closed(&self) {
        self.rooms_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_players_joined(&self) {
        self.players_joined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_players_left(&self) {
        self.players_left.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_hosts_migrated(&self) {
        self.hosts_migrated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sessions_replaced(&self) {
        self.sessions_replaced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_frames_relayed(&self) {
        self.frames_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_frames_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_malformed_frames(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_snapshot_failures(&self) {
        self.snapshot_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stats_events(&self) {
        self.stats_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stats_failures(&self) {
        self.stats_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn view(&self) -> MetricsView {
        MetricsView {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rooms_created: self.rooms_created.load(Ordering::Relaxed),
            rooms_closed: self.rooms_closed.load(Ordering::Relaxed),
            players_joined: self.players_joined.load(Ordering::Relaxed),
            players_left: self.players_left.load(Ordering::Relaxed),
            hosts_migrated: self.hosts_migrated.load(Ordering::Relaxed),
            sessions_replaced: self.sessions_replaced.load(Ordering::Relaxed),
            frames_relayed: self.frames_relayed.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            snapshot_failures: self.snapshot_failures.load(Ordering::Relaxed),
            stats_events: self.stats_events.load(Ordering::Relaxed),
            stats_failures: self.stats_failures.load(Ordering::Relaxed),
        }
    }
}
