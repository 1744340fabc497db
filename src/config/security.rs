//! Security configuration types.

use super::defaults::default_cors_origins;
use serde::{Deserialize, Serialize};

/// Security settings for the public and internal planes.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Shared bearer secret guarding `/internal/*`. When unset, every
    /// internal-plane request is rejected.
    #[serde(default)]
    pub internal_secret: Option<String>,
    /// Comma-separated allowed CORS origins, or `*` for permissive.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            internal_secret: None,
            cors_origins: default_cors_origins(),
        }
    }
}
