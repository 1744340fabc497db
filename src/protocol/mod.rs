//! Wire protocol and core domain types.
//!
//! Everything a room client or tenant surface sees on the wire lives here:
//! identifier newtypes, the tagged JSON frame enums, the room snapshot
//! shape, and the room-code allocator.

pub mod messages;
pub mod room_codes;
pub mod snapshot;
pub mod types;

pub use messages::{ClientFrame, ConnectedPayload, ServerFrame};
pub use room_codes::{generate_code, ActorKey, CODE_ALPHABET};
pub use snapshot::{Room, RoomSummary, RosterEntry};
pub use types::{
    GameId, PlayerId, RoomCode, Tenant, API_KEY_PREFIX, DEFAULT_ROOM_CODE_LENGTH, MAX_SAVE_BYTES,
};
