use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::snapshot::RoomSummary;
use super::types::PlayerId;

/// Frames sent from client to server over a room socket. All frames are
/// JSON objects tagged by `type`; unknown tags deserialize to [`Self::Unknown`]
/// and are dropped by the actor for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Replace the sender's ephemeral state. Fast-pathed to peers and
    /// re-sent in the next `players_sync` batch.
    PlayerState { state: Value },
    /// Replace the shared game state wholesale. Host only; silently
    /// ignored from anyone else.
    GameState { state: Value },
    /// Hand host rights to another roster member. Host only.
    #[serde(rename_all = "camelCase")]
    TransferHost { new_host_id: PlayerId },
    /// Relay an arbitrary payload to the whole room.
    #[serde(rename_all = "camelCase")]
    Broadcast {
        data: Value,
        #[serde(default)]
        exclude_self: bool,
    },
    /// Relay an arbitrary payload to one named player.
    #[serde(rename = "send")]
    SendTo { to: PlayerId, data: Value },
    /// Liveness probe; answered with `pong` to the sender only.
    Ping,
    /// Any unrecognized `type` tag.
    #[serde(other)]
    Unknown,
}

/// Full late-joiner snapshot delivered immediately after admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    pub player_id: PlayerId,
    pub room: RoomSummary,
    pub player_states: HashMap<PlayerId, Value>,
    pub game_state: Value,
}

/// Frames sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Admission acknowledgement carrying the full room state (boxed to
    /// keep the enum small).
    Connected(Box<ConnectedPayload>),
    /// Periodic batch of every player's ephemeral state.
    PlayersSync { players: HashMap<PlayerId, Value> },
    /// Fast-path single-player state delta.
    #[serde(rename_all = "camelCase")]
    PlayerStateUpdate { player_id: PlayerId, state: Value },
    /// Shared game state replaced by the host.
    GameStateSync { state: Value },
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player_id: PlayerId,
        player_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: PlayerId,
        player_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    HostChanged { host_id: PlayerId },
    /// Relayed peer payload from `broadcast` or `send`.
    Message { from: PlayerId, data: Value },
    Pong { timestamp: i64 },
}
