//! Room registry and actor runtime.
//!
//! Resolves `(gameId, code)` to a live actor task, spawning one on demand.
//! The name-to-actor mapping is deterministic: canonical uppercase code,
//! hashed with the tenant id, always lands on the same registry slot.
//! Actors wind themselves down when their room is gone; the registry
//! detects the closed inbox and respawns on the next delivery, which is
//! how hibernated rooms resurrect from their snapshot.

pub mod actor;

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::metrics::ServerMetrics;
use crate::protocol::{generate_code, ActorKey, GameId, PlayerId, RoomCode, RoomSummary};
use crate::stats::StatsAccumulator;
use crate::storage::KvStore;

pub use actor::{
    JoinOutcome, RoomCommand, RoomError, SessionId, SessionOutbound, REPLACED_CLOSE_CODE,
    REPLACED_CLOSE_REASON,
};

use actor::RoomActor;

/// Runtime knobs for room actors.
#[derive(Debug, Clone)]
pub struct RoomRuntimeConfig {
    /// Broadcast timer period. 50 ms = the 20 Hz sync tick.
    pub tick_interval: Duration,
    /// Actor inbox depth before senders wait.
    pub inbox_capacity: usize,
    /// Per-session outbound queue depth before frames are dropped.
    pub session_queue_capacity: usize,
    /// Generated room code length.
    pub code_length: usize,
    /// Fresh codes tried before a create surfaces `AlreadyExists`.
    pub create_attempts: usize,
}

impl Default for RoomRuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            inbox_capacity: 256,
            session_queue_capacity: 64,
            code_length: crate::protocol::DEFAULT_ROOM_CODE_LENGTH,
            create_attempts: 5,
        }
    }
}

#[derive(Clone)]
struct RoomHandle {
    tx: mpsc::Sender<RoomCommand>,
}

/// Ticket returned by a successful WebSocket admission: the transport
/// pushes frames and the final detach straight onto the actor's inbox.
#[derive(Clone, Debug)]
pub struct SessionTicket {
    pub session_id: SessionId,
    pub player_id: PlayerId,
    inbox: mpsc::Sender<RoomCommand>,
}

impl SessionTicket {
    /// Forward one text frame from the socket to the actor.
    pub async fn frame(&self, text: String) -> Result<(), RoomError> {
        self.inbox
            .send(RoomCommand::Frame {
                session_id: self.session_id,
                player_id: self.player_id.clone(),
                text,
            })
            .await
            .map_err(|_| RoomError::Unavailable)
    }

    /// Tell the actor this session's socket is gone.
    pub async fn detach(&self) {
        let _ = self
            .inbox
            .send(RoomCommand::Detach {
                session_id: self.session_id,
                player_id: self.player_id.clone(),
            })
            .await;
    }
}

/// Owner of every room actor in the process.
pub struct RoomRegistry {
    actors: Arc<DashMap<ActorKey, RoomHandle>>,
    snapshots: Arc<dyn KvStore>,
    stats: Arc<StatsAccumulator>,
    metrics: Arc<ServerMetrics>,
    config: RoomRuntimeConfig,
}

impl RoomRegistry {
    pub fn new(
        snapshots: Arc<dyn KvStore>,
        stats: Arc<StatsAccumulator>,
        metrics: Arc<ServerMetrics>,
        config: RoomRuntimeConfig,
    ) -> Self {
        Self {
            actors: Arc::new(DashMap::new()),
            snapshots,
            stats,
            metrics,
            config,
        }
    }

    /// Create a room under a freshly generated code, retrying a bounded
    /// number of times when the code is already taken.
    pub async fn create(
        &self,
        game_id: &GameId,
        host_id: &PlayerId,
    ) -> Result<(RoomCode, RoomSummary), RoomError> {
        for attempt in 0..self.config.create_attempts {
            let code = generate_code(self.config.code_length);
            match self.create_with_code(game_id, &code, host_id).await {
                Ok(summary) => return Ok((code, summary)),
                Err(RoomError::AlreadyExists) => {
                    tracing::debug!(
                        game_id = %game_id,
                        code = %code,
                        attempt,
                        "Room code collision, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Err(RoomError::AlreadyExists)
    }

    /// Create a room under a specific code. `AlreadyExists` when that
    /// code currently addresses a live room for this tenant.
    /// A dropped reply means the actor wound down with the command still
    /// queued — it was never handled, so one full retry is safe.
    pub async fn create_with_code(
        &self,
        game_id: &GameId,
        code: &RoomCode,
        host_id: &PlayerId,
    ) -> Result<RoomSummary, RoomError> {
        for _ in 0..2 {
            let (reply_tx, reply_rx) = oneshot::channel();
            self.deliver(
                game_id,
                code,
                RoomCommand::Create {
                    host_id: host_id.clone(),
                    reply: reply_tx,
                },
            )
            .await?;
            if let Ok(result) = reply_rx.await {
                return result;
            }
        }
        Err(RoomError::Unavailable)
    }

    pub async fn info(&self, game_id: &GameId, code: &RoomCode) -> Result<RoomSummary, RoomError> {
        for _ in 0..2 {
            let (reply_tx, reply_rx) = oneshot::channel();
            self.deliver(game_id, code, RoomCommand::Info { reply: reply_tx })
                .await?;
            if let Ok(result) = reply_rx.await {
                return result;
            }
        }
        Err(RoomError::Unavailable)
    }

    pub async fn join(
        &self,
        game_id: &GameId,
        code: &RoomCode,
        player_id: &PlayerId,
    ) -> Result<JoinOutcome, RoomError> {
        for _ in 0..2 {
            let (reply_tx, reply_rx) = oneshot::channel();
            self.deliver(
                game_id,
                code,
                RoomCommand::Join {
                    player_id: player_id.clone(),
                    reply: reply_tx,
                },
            )
            .await?;
            if let Ok(result) = reply_rx.await {
                return result;
            }
        }
        Err(RoomError::Unavailable)
    }

    /// Admit a WebSocket session. On success the returned ticket carries
    /// the actor inbox for this session's frames and close.
    pub async fn attach(
        &self,
        game_id: &GameId,
        code: &RoomCode,
        player_id: &PlayerId,
        sender: mpsc::Sender<SessionOutbound>,
    ) -> Result<SessionTicket, RoomError> {
        for _ in 0..2 {
            let (reply_tx, reply_rx) = oneshot::channel();
            let inbox = self
                .deliver(
                    game_id,
                    code,
                    RoomCommand::Attach {
                        player_id: player_id.clone(),
                        sender: sender.clone(),
                        reply: reply_tx,
                    },
                )
                .await?;
            if let Ok(result) = reply_rx.await {
                let session_id = result?;
                return Ok(SessionTicket {
                    session_id,
                    player_id: player_id.clone(),
                    inbox,
                });
            }
        }
        Err(RoomError::Unavailable)
    }

    /// Per-session outbound queue capacity, for the transport layer.
    pub fn session_queue_capacity(&self) -> usize {
        self.config.session_queue_capacity
    }

    /// Number of live actors (test and metrics visibility).
    pub fn live_actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Deliver a command to the actor for `(gameId, code)`, spawning or
    /// respawning it as needed. An actor that wound down between lookup
    /// and send returns the command, so delivery retries with a fresh
    /// spawn — this is the resurrection path.
    async fn deliver(
        &self,
        game_id: &GameId,
        code: &RoomCode,
        mut command: RoomCommand,
    ) -> Result<mpsc::Sender<RoomCommand>, RoomError> {
        let key = ActorKey::from_name(game_id, code);
        for _ in 0..2 {
            let handle = self.handle_for(key, game_id, code);
            match handle.tx.send(command).await {
                Ok(()) => return Ok(handle.tx),
                Err(mpsc::error::SendError(returned)) => {
                    command = returned;
                    self.actors
                        .remove_if(&key, |_, entry| entry.tx.same_channel(&handle.tx));
                }
            }
        }
        Err(RoomError::Unavailable)
    }

    fn handle_for(&self, key: ActorKey, game_id: &GameId, code: &RoomCode) -> RoomHandle {
        self.actors
            .entry(key)
            .or_insert_with(|| self.spawn(key, game_id.clone(), code.clone()))
            .clone()
    }

    fn spawn(&self, key: ActorKey, game_id: GameId, code: RoomCode) -> RoomHandle {
        let (tx, rx) = mpsc::channel(self.config.inbox_capacity);
        let actor = RoomActor::new(
            game_id,
            code,
            rx,
            Arc::clone(&self.snapshots),
            Arc::clone(&self.stats),
            Arc::clone(&self.metrics),
            self.config.tick_interval,
        );

        let actors = Arc::clone(&self.actors);
        let tx_for_cleanup = tx.clone();
        tokio::spawn(async move {
            actor.run().await;
            // Drop the registry entry only if it is still ours; a respawn
            // may already have replaced it.
            actors.remove_if(&key, |_, entry| entry.tx.same_channel(&tx_for_cleanup));
        });

        RoomHandle { tx }
    }
}
