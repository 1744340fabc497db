use thiserror::Error;

/// Failures produced while resolving a public request's tenant context,
/// in the precedence order the gate checks them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("playerId is required (X-Player-ID header or playerId query parameter)")]
    PlayerIdRequired,
    #[error("API key is required (Authorization: Bearer header or apiKey query parameter)")]
    AuthRequired,
    #[error("API key must start with `wt_`")]
    InvalidKeyFormat,
    #[error("unknown API key")]
    InvalidKey,
    #[error("invalid internal secret")]
    InvalidInternalSecret,
    /// The key registry itself failed; not an authentication verdict.
    #[error("API key lookup failed")]
    LookupFailed,
}
