//! Configuration validation functions.

use super::Config;

/// Validate security-sensitive settings. Hard-fails in production when
/// the internal plane would be unusable or trivially guessable.
pub fn validate_config_security(config: &Config) -> anyhow::Result<()> {
    let is_prod = is_production_mode();

    match config.security.internal_secret.as_deref() {
        None | Some("") => {
            if is_prod {
                anyhow::bail!(
                    "\nCRITICAL: No internal secret is configured!\n\
                     ===================================================================\n\
                     The /internal key-administration plane rejects every request\n\
                     until a shared bearer secret is set:\n\
                     export GAMEDOCK__SECURITY__INTERNAL_SECRET=\"$(openssl rand -hex 32)\"\n\
                     ===================================================================\n"
                );
            }
            eprintln!(
                "WARNING: security.internal_secret is not set; \
                 all /internal requests will be rejected"
            );
        }
        Some(secret) if secret.len() < 16 => {
            eprintln!(
                "WARNING: internal secret is very short ({} chars). \
                 Recommended: at least 32 characters. \
                 Generate a strong secret: openssl rand -hex 32",
                secret.len()
            );
        }
        Some(_) => {}
    }

    if config.server.tick_interval_ms == 0 {
        anyhow::bail!("server.tick_interval_ms must be greater than zero");
    }
    if config.server.room_code_length == 0 {
        anyhow::bail!("server.room_code_length must be greater than zero");
    }
    if config.server.create_attempts == 0 {
        anyhow::bail!("server.create_attempts must be greater than zero");
    }
    if config.server.inbox_capacity == 0 || config.server.session_queue_capacity == 0 {
        anyhow::bail!("server channel capacities must be greater than zero");
    }

    Ok(())
}

/// Detect if we're running in production mode.
///
/// Checks `GAMEDOCK__ENVIRONMENT` and the generic `PRODUCTION` / `PROD`
/// environment variables.
pub fn is_production_mode() -> bool {
    use std::env;

    if let Ok(mode) = env::var("GAMEDOCK__ENVIRONMENT") {
        return mode.to_lowercase() == "production" || mode.to_lowercase() == "prod";
    }

    env::var("GAMEDOCK_PRODUCTION").is_ok()
        || env::var("PRODUCTION").is_ok()
        || env::var("PROD").is_ok()
}
