pub mod error;
pub mod gate;

pub use error::AuthError;
pub use gate::{AuthGate, InternalGate};
