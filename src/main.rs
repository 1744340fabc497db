#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use gamedock_server::config;
use gamedock_server::http::{create_router, AppState};
use gamedock_server::logging;
use std::net::SocketAddr;
use std::sync::Arc;

/// GameDock -- multi-tenant real-time relay and session service for small
/// game clients
#[derive(Parser, Debug)]
#[command(name = "gamedock-server")]
#[command(about = "Multi-tenant real-time relay and session service for small game clients")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading from multiple sources.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from config.json if present; otherwise use code
    // defaults.
    let cfg = Arc::new(config::load());

    if cli.print_config {
        let json = serde_json::to_string_pretty(&*cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // config::load() already validates but only logs to stderr; capture
    // the result here for a proper exit code and hard production failure.
    let validation_result = config::validate_config_security(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Storage backend: InMemory");
                println!("  Tick interval: {} ms", cfg.server.tick_interval_ms);
                println!("  Room code length: {}", cfg.server.room_code_length);
                println!(
                    "  Internal secret configured: {}",
                    cfg.security.internal_secret.is_some()
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "Starting GameDock server");

    let state = AppState::new(&cfg);
    tracing::info!(instance_id = %state.instance_id, "Service state initialized");
    let app = create_router(state, &cfg.security.cors_origins);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cfg.security.cors_origins,
        "Server started - rooms: /v1/rooms, saves: /v1/saves, stats: /v1/stats"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
