use crate::protocol::{GameId, RoomCode};
use rand::RngExt;
use sha2::{Digest, Sha256};

/// Room-code alphabet: uppercase letters and digits with the easily
/// confused glyphs (0/O, 1/I/L) removed. 31 characters; at the default
/// length of 4 that is ~923k distinct codes per tenant.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Generate a room code of the requested length from [`CODE_ALPHABET`].
pub fn generate_code(length: usize) -> RoomCode {
    let mut rng = rand::rng();
    let code: String = (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            // SAFETY: `idx` is produced by `random_range(0..len)`, so it is
            // always within [0, len).
            #[allow(clippy::indexing_slicing)]
            let ch = CODE_ALPHABET[idx] as char;
            ch
        })
        .collect();
    RoomCode::new(code)
}

/// Deterministic actor address for a `(gameId, code)` pair.
///
/// The same canonical code always resolves to the same key, so every
/// lookup for a room lands on the same actor instance regardless of which
/// request path produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorKey([u8; 32]);

impl ActorKey {
    pub fn from_name(game_id: &GameId, code: &RoomCode) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(game_id.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(code.as_str().as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }
}
