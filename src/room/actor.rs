//! The room actor.
//!
//! Exactly one task runs per `(gameId, code)`. Every ingress path — HTTP
//! create/info/join, WebSocket admission, every frame and close — is a
//! command on the actor's inbox, so handlers never interleave for the
//! same room. A handler finishes its roster/state mutation and snapshot
//! write before the next command is taken off the inbox.

use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::metrics::ServerMetrics;
use crate::protocol::{
    ClientFrame, ConnectedPayload, GameId, PlayerId, Room, RoomCode, RoomSummary, ServerFrame,
};
use crate::stats::{StatsAccumulator, StatsEvent};
use crate::storage::{keys, KvStore};

/// WebSocket close code used when a newer connection replaces an open one.
pub const REPLACED_CLOSE_CODE: u16 = 1000;
/// Close reason sent alongside [`REPLACED_CLOSE_CODE`].
pub const REPLACED_CLOSE_REASON: &str = "Replaced by new connection";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("room not found")]
    NotFound,
    #[error("room already exists")]
    AlreadyExists,
    #[error("room actor unavailable")]
    Unavailable,
}

/// Result of an HTTP `join`.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub newly_added: bool,
    pub summary: RoomSummary,
}

/// What a session's writer task receives from the actor.
#[derive(Debug, Clone)]
pub enum SessionOutbound {
    Frame(Arc<ServerFrame>),
    Close { code: u16, reason: &'static str },
}

/// Ticket handed back on successful WebSocket admission. The transport
/// uses it to address subsequent frames and the final close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub u64);

/// Commands delivered through a room actor's inbox — the serialization
/// point for everything that touches one room.
#[derive(Debug)]
pub enum RoomCommand {
    Create {
        host_id: PlayerId,
        reply: oneshot::Sender<Result<RoomSummary, RoomError>>,
    },
    Info {
        reply: oneshot::Sender<Result<RoomSummary, RoomError>>,
    },
    Join {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<JoinOutcome, RoomError>>,
    },
    /// WebSocket admission: register the session's outbound channel.
    Attach {
        player_id: PlayerId,
        sender: mpsc::Sender<SessionOutbound>,
        reply: oneshot::Sender<Result<SessionId, RoomError>>,
    },
    /// One text frame from a live session.
    Frame {
        session_id: SessionId,
        player_id: PlayerId,
        text: String,
    },
    /// The session's socket closed, errored, or was replaced.
    Detach {
        session_id: SessionId,
        player_id: PlayerId,
    },
}

struct Session {
    id: SessionId,
    sender: mpsc::Sender<SessionOutbound>,
}

pub(super) struct RoomActor {
    game_id: GameId,
    code: RoomCode,
    inbox: mpsc::Receiver<RoomCommand>,
    snapshots: Arc<dyn KvStore>,
    stats: Arc<StatsAccumulator>,
    metrics: Arc<ServerMetrics>,
    tick_interval: std::time::Duration,
    room: Option<Room>,
    sessions: HashMap<PlayerId, Session>,
    next_session_id: u64,
    dirty: bool,
}

impl RoomActor {
    pub(super) fn new(
        game_id: GameId,
        code: RoomCode,
        inbox: mpsc::Receiver<RoomCommand>,
        snapshots: Arc<dyn KvStore>,
        stats: Arc<StatsAccumulator>,
        metrics: Arc<ServerMetrics>,
        tick_interval: std::time::Duration,
    ) -> Self {
        Self {
            game_id,
            code,
            inbox,
            snapshots,
            stats,
            metrics,
            tick_interval,
            room: None,
            sessions: HashMap::new(),
            next_session_id: 0,
            dirty: false,
        }
    }

    /// Actor main loop: cold-boot from the snapshot, then serialize
    /// commands and the broadcast tick until the room is gone.
    pub(super) async fn run(mut self) {
        self.boot().await;

        let mut tick = tokio::time::interval(self.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.inbox.recv() => {
                    let Some(command) = command else { break };
                    self.handle(command).await;
                    if self.room.is_none() && self.sessions.is_empty() && self.inbox.is_empty() {
                        // Hibernation-ready: the snapshot is deleted, no
                        // socket can reach us, and nothing is queued. The
                        // registry respawns a fresh actor on the next
                        // delivery for this code.
                        break;
                    }
                }
                // The broadcast timer only runs while sessions are attached.
                _ = tick.tick(), if !self.sessions.is_empty() => {
                    self.flush_dirty().await;
                }
            }
        }

        tracing::debug!(game_id = %self.game_id, code = %self.code, "Room actor wound down");
    }

    /// Restore the room from its last serialized shape, if any. Runs
    /// before the first command is processed.
    async fn boot(&mut self) {
        let key = keys::room_snapshot(&self.game_id, &self.code);
        match self.snapshots.get(&key).await {
            Ok(Some(value)) => match serde_json::from_value::<Room>(value) {
                Ok(room) => {
                    tracing::info!(
                        game_id = %self.game_id,
                        code = %self.code,
                        player_count = room.player_count(),
                        "Room resurrected from snapshot"
                    );
                    self.room = Some(room);
                }
                Err(err) => {
                    tracing::error!(
                        game_id = %self.game_id,
                        code = %self.code,
                        error = %err,
                        "Discarding unreadable room snapshot"
                    );
                }
            },
            Ok(None) => {}
            Err(err) => {
                tracing::error!(
                    game_id = %self.game_id,
                    code = %self.code,
                    error = %err,
                    "Failed to read room snapshot on boot"
                );
            }
        }
    }

    async fn handle(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Create { host_id, reply } => {
                let _ = reply.send(self.handle_create(host_id).await);
            }
            RoomCommand::Info { reply } => {
                let result = self
                    .room
                    .as_ref()
                    .map(Room::summary)
                    .ok_or(RoomError::NotFound);
                let _ = reply.send(result);
            }
            RoomCommand::Join { player_id, reply } => {
                let _ = reply.send(self.handle_join(player_id).await);
            }
            RoomCommand::Attach {
                player_id,
                sender,
                reply,
            } => {
                let _ = reply.send(self.handle_attach(player_id, sender).await);
            }
            RoomCommand::Frame {
                session_id,
                player_id,
                text,
            } => {
                self.handle_frame(session_id, &player_id, &text).await;
            }
            RoomCommand::Detach {
                session_id,
                player_id,
            } => {
                self.handle_detach(session_id, &player_id).await;
            }
        }
    }

    async fn handle_create(&mut self, host_id: PlayerId) -> Result<RoomSummary, RoomError> {
        if self.room.is_some() {
            return Err(RoomError::AlreadyExists);
        }

        let room = Room::create(
            self.game_id.clone(),
            self.code.clone(),
            host_id.clone(),
            Utc::now(),
        );
        let summary = room.summary();
        self.room = Some(room);
        self.save_state().await;

        self.metrics.increment_rooms_created();
        self.metrics.increment_players_joined();
        self.emit_stats(&host_id, StatsEvent::RoomCreate).await;
        self.emit_stats(&host_id, StatsEvent::RoomJoin).await;

        tracing::info!(
            game_id = %self.game_id,
            code = %self.code,
            host_id = %host_id,
            "Room created"
        );
        Ok(summary)
    }

    async fn handle_join(&mut self, player_id: PlayerId) -> Result<JoinOutcome, RoomError> {
        let Some(room) = self.room.as_mut() else {
            return Err(RoomError::NotFound);
        };

        let newly_added = room.admit(&player_id, Utc::now());
        let summary = room.summary();
        if newly_added {
            self.save_state().await;
            self.metrics.increment_players_joined();
            self.emit_stats(&player_id, StatsEvent::RoomJoin).await;
            self.broadcast_except(
                &player_id,
                ServerFrame::PlayerJoined {
                    player_id: player_id.clone(),
                    player_count: summary.player_count,
                },
            );
            tracing::info!(
                game_id = %self.game_id,
                code = %self.code,
                player_id = %player_id,
                "Player joined room"
            );
        }

        Ok(JoinOutcome {
            newly_added,
            summary,
        })
    }

    async fn handle_attach(
        &mut self,
        player_id: PlayerId,
        sender: mpsc::Sender<SessionOutbound>,
    ) -> Result<SessionId, RoomError> {
        if self.room.is_none() {
            return Err(RoomError::NotFound);
        }

        // One open session per player: close the old socket before the
        // new one is live so `send` semantics stay unambiguous.
        if let Some(previous) = self.sessions.remove(&player_id) {
            let _ = previous.sender.try_send(SessionOutbound::Close {
                code: REPLACED_CLOSE_CODE,
                reason: REPLACED_CLOSE_REASON,
            });
            self.metrics.increment_sessions_replaced();
            tracing::info!(
                game_id = %self.game_id,
                code = %self.code,
                player_id = %player_id,
                "Replaced existing session for player"
            );
        }

        // Roster admission happens on first contact, whether that was an
        // HTTP join or this socket.
        let newly_added = {
            // Room presence was checked above; the borrow is scoped so the
            // broadcast helpers below can re-borrow.
            let room = match self.room.as_mut() {
                Some(room) => room,
                None => return Err(RoomError::NotFound),
            };
            room.admit(&player_id, Utc::now())
        };
        if newly_added {
            self.save_state().await;
            self.metrics.increment_players_joined();
            self.emit_stats(&player_id, StatsEvent::RoomJoin).await;
        }

        self.next_session_id += 1;
        let session_id = SessionId(self.next_session_id);
        self.sessions.insert(
            player_id.clone(),
            Session {
                id: session_id,
                sender,
            },
        );

        // Late-joiner snapshot straight to the newcomer, then announce to
        // the rest of the room.
        let (payload, player_count) = {
            // Room cannot be None here.
            let Some(room) = self.room.as_ref() else {
                return Err(RoomError::NotFound);
            };
            (
                ConnectedPayload {
                    player_id: player_id.clone(),
                    room: room.summary(),
                    player_states: room.player_states.clone(),
                    game_state: room.game_state.clone(),
                },
                room.player_count(),
            )
        };
        self.send_to(&player_id, ServerFrame::Connected(Box::new(payload)));
        self.broadcast_except(
            &player_id,
            ServerFrame::PlayerJoined {
                player_id: player_id.clone(),
                player_count,
            },
        );

        tracing::info!(
            game_id = %self.game_id,
            code = %self.code,
            player_id = %player_id,
            session = session_id.0,
            "Session attached"
        );
        Ok(session_id)
    }

    async fn handle_frame(&mut self, session_id: SessionId, player_id: &PlayerId, text: &str) {
        // Frames from a replaced socket may still be in flight; only the
        // current session for a player is heard.
        if self.sessions.get(player_id).map(|s| s.id) != Some(session_id) {
            return;
        }

        let frame: ClientFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(err) => {
                self.metrics.increment_malformed_frames();
                tracing::warn!(
                    game_id = %self.game_id,
                    code = %self.code,
                    player_id = %player_id,
                    error = %err,
                    "Dropping malformed client frame"
                );
                return;
            }
        };

        match frame {
            ClientFrame::PlayerState { state } => {
                self.handle_player_state(player_id, state);
            }
            ClientFrame::GameState { state } => {
                self.handle_game_state(player_id, state).await;
            }
            ClientFrame::TransferHost { new_host_id } => {
                self.handle_transfer_host(player_id, &new_host_id).await;
            }
            ClientFrame::Broadcast { data, exclude_self } => {
                let message = ServerFrame::Message {
                    from: player_id.clone(),
                    data,
                };
                if exclude_self {
                    self.broadcast_except(player_id, message);
                } else {
                    self.broadcast_all(message);
                }
                self.metrics.increment_frames_relayed();
            }
            ClientFrame::SendTo { to, data } => {
                self.send_to(
                    &to,
                    ServerFrame::Message {
                        from: player_id.clone(),
                        data,
                    },
                );
                self.metrics.increment_frames_relayed();
            }
            ClientFrame::Ping => {
                self.send_to(
                    player_id,
                    ServerFrame::Pong {
                        timestamp: Utc::now().timestamp_millis(),
                    },
                );
            }
            ClientFrame::Unknown => {
                tracing::debug!(
                    game_id = %self.game_id,
                    code = %self.code,
                    player_id = %player_id,
                    "Ignoring unknown client frame type"
                );
            }
        }
    }

    /// Fast path: store the delta, mark the room dirty for the next tick,
    /// and push the single-player update to peers immediately.
    fn handle_player_state(&mut self, player_id: &PlayerId, state: Value) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        if !room.contains(player_id) {
            return;
        }
        room.player_states.insert(player_id.clone(), state.clone());
        self.dirty = true;
        self.broadcast_except(
            player_id,
            ServerFrame::PlayerStateUpdate {
                player_id: player_id.clone(),
                state,
            },
        );
    }

    /// Host authority: only the current host may replace the shared game
    /// state. Anyone else is silently ignored.
    async fn handle_game_state(&mut self, player_id: &PlayerId, state: Value) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        if room.host_id != *player_id {
            tracing::debug!(
                game_id = %self.game_id,
                code = %self.code,
                player_id = %player_id,
                "Ignoring game_state from non-host"
            );
            return;
        }
        room.game_state = state.clone();
        self.save_state().await;
        // Echoed to the sender too, as confirmation.
        self.broadcast_all(ServerFrame::GameStateSync { state });
    }

    async fn handle_transfer_host(&mut self, player_id: &PlayerId, new_host_id: &PlayerId) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        if room.host_id != *player_id || !room.contains(new_host_id) {
            tracing::debug!(
                game_id = %self.game_id,
                code = %self.code,
                player_id = %player_id,
                new_host_id = %new_host_id,
                "Ignoring invalid transfer_host"
            );
            return;
        }
        room.host_id = new_host_id.clone();
        self.save_state().await;
        self.metrics.increment_hosts_migrated();
        self.broadcast_all(ServerFrame::HostChanged {
            host_id: new_host_id.clone(),
        });
        tracing::info!(
            game_id = %self.game_id,
            code = %self.code,
            old_host = %player_id,
            new_host = %new_host_id,
            "Host transferred"
        );
    }

    async fn handle_detach(&mut self, session_id: SessionId, player_id: &PlayerId) {
        // A close from a replaced socket must not tear down the live one.
        match self.sessions.get(player_id) {
            Some(session) if session.id == session_id => {
                self.sessions.remove(player_id);
            }
            _ => return,
        }

        let Some(room) = self.room.as_mut() else {
            return;
        };
        let was_host = room.host_id == *player_id;
        if !room.remove(player_id) {
            return;
        }
        self.metrics.increment_players_left();
        self.emit_stats(player_id, StatsEvent::RoomLeave).await;

        if self.room.as_ref().is_some_and(Room::is_empty) {
            self.close_room(player_id).await;
            return;
        }

        if was_host {
            self.promote_successor().await;
        }

        self.save_state().await;
        let player_count = self.room.as_ref().map_or(0, Room::player_count);
        self.broadcast_all(ServerFrame::PlayerLeft {
            player_id: player_id.clone(),
            player_count,
        });
        tracing::info!(
            game_id = %self.game_id,
            code = %self.code,
            player_id = %player_id,
            player_count,
            "Player left room"
        );
    }

    /// Last member gone: delete the snapshot and null the room. The run
    /// loop notices and winds the actor down.
    async fn close_room(&mut self, last_player: &PlayerId) {
        let key = keys::room_snapshot(&self.game_id, &self.code);
        if let Err(err) = self.snapshots.delete(&key).await {
            tracing::error!(
                game_id = %self.game_id,
                code = %self.code,
                error = %err,
                "Failed to delete room snapshot"
            );
        }
        self.room = None;
        self.dirty = false;
        self.metrics.increment_rooms_closed();
        self.emit_stats(last_player, StatsEvent::RoomClose).await;
        tracing::info!(game_id = %self.game_id, code = %self.code, "Room closed");
    }

    async fn promote_successor(&mut self) {
        let Some(room) = self.room.as_mut() else {
            return;
        };
        let Some(successor) = room.successor() else {
            return;
        };
        room.host_id = successor.clone();
        self.metrics.increment_hosts_migrated();
        self.broadcast_all(ServerFrame::HostChanged {
            host_id: successor.clone(),
        });
        tracing::info!(
            game_id = %self.game_id,
            code = %self.code,
            new_host = %successor,
            "Host migrated"
        );
    }

    /// One `players_sync` batch per tick while dirty.
    async fn flush_dirty(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        let Some(room) = self.room.as_ref() else {
            return;
        };
        self.broadcast_all(ServerFrame::PlayersSync {
            players: room.player_states.clone(),
        });
    }

    /// Persist the current room. In-memory state stays authoritative on
    /// failure; the next successful persist supersedes.
    async fn save_state(&mut self) {
        let Some(room) = self.room.as_ref() else {
            return;
        };
        let key = keys::room_snapshot(&self.game_id, &self.code);
        let value = match serde_json::to_value(room) {
            Ok(value) => value,
            Err(err) => {
                self.metrics.increment_snapshot_failures();
                tracing::error!(
                    game_id = %self.game_id,
                    code = %self.code,
                    error = %err,
                    "Failed to serialize room snapshot"
                );
                return;
            }
        };
        if let Err(err) = self.snapshots.put(&key, value).await {
            self.metrics.increment_snapshot_failures();
            tracing::error!(
                game_id = %self.game_id,
                code = %self.code,
                error = %err,
                "Failed to persist room snapshot"
            );
        }
    }

    async fn emit_stats(&self, player_id: &PlayerId, event: StatsEvent) {
        self.metrics.increment_stats_events();
        if let Err(err) = self.stats.record(&self.game_id, player_id, event).await {
            self.metrics.increment_stats_failures();
            tracing::warn!(
                game_id = %self.game_id,
                error = %err,
                "Failed to record stats event"
            );
        }
    }

    fn send_to(&self, player_id: &PlayerId, frame: ServerFrame) {
        let Some(session) = self.sessions.get(player_id) else {
            return;
        };
        let frame = Arc::new(frame);
        if session
            .sender
            .try_send(SessionOutbound::Frame(frame))
            .is_err()
        {
            self.metrics.increment_frames_dropped();
            tracing::warn!(
                game_id = %self.game_id,
                code = %self.code,
                player_id = %player_id,
                "Failed to enqueue frame for session"
            );
        }
    }

    fn broadcast_all(&self, frame: ServerFrame) {
        let frame = Arc::new(frame);
        for (player_id, session) in &self.sessions {
            if session
                .sender
                .try_send(SessionOutbound::Frame(Arc::clone(&frame)))
                .is_err()
            {
                self.metrics.increment_frames_dropped();
                tracing::warn!(
                    game_id = %self.game_id,
                    code = %self.code,
                    player_id = %player_id,
                    "Failed to enqueue broadcast frame"
                );
            }
        }
    }

    fn broadcast_except(&self, except: &PlayerId, frame: ServerFrame) {
        let frame = Arc::new(frame);
        for (player_id, session) in &self.sessions {
            if player_id == except {
                continue;
            }
            if session
                .sender
                .try_send(SessionOutbound::Frame(Arc::clone(&frame)))
                .is_err()
            {
                self.metrics.increment_frames_dropped();
                tracing::warn!(
                    game_id = %self.game_id,
                    code = %self.code,
                    player_id = %player_id,
                    "Failed to enqueue broadcast frame"
                );
            }
        }
    }
}
