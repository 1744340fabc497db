//! HTTP and WebSocket transport adapter.
//!
//! Terminates the public `/v1` surfaces (saves, rooms, stats), the
//! `/internal` admin plane, and the health root; dispatches WebSocket
//! upgrades to room actors; and feeds session lifecycle events into the
//! stats accumulator.

pub mod error;
pub mod keys_api;
pub mod rooms_api;
pub mod saves_api;
pub mod stats_api;
pub mod ws;

pub use error::ApiError;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{AuthGate, InternalGate};
use crate::config::Config;
use crate::keys::KeyRegistry;
use crate::metrics::ServerMetrics;
use crate::room::{RoomRegistry, RoomRuntimeConfig};
use crate::saves::SavesStore;
use crate::stats::StatsAccumulator;
use crate::storage::{create_store, StoreConfig};

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RoomRegistry>,
    pub saves: SavesStore,
    pub stats: Arc<StatsAccumulator>,
    pub keys: KeyRegistry,
    pub auth: Arc<AuthGate>,
    pub internal: Arc<InternalGate>,
    pub metrics: Arc<ServerMetrics>,
    /// Identifier for this process instance, carried in logs.
    pub instance_id: Uuid,
}

impl AppState {
    /// Wire up the full service graph from configuration. The shared KV
    /// namespace backs keys/saves/stats; room snapshots get a dedicated
    /// store instance so actor state never co-tenants with them.
    pub fn new(config: &Config) -> Self {
        let shared_store: Arc<dyn crate::storage::KvStore> =
            Arc::from(create_store(StoreConfig::InMemory));
        let snapshot_store: Arc<dyn crate::storage::KvStore> =
            Arc::from(create_store(StoreConfig::InMemory));

        let metrics = Arc::new(ServerMetrics::new());
        let stats = Arc::new(StatsAccumulator::new(Arc::clone(&shared_store)));
        let keys = KeyRegistry::new(Arc::clone(&shared_store));
        let saves = SavesStore::new(Arc::clone(&shared_store));
        let auth = Arc::new(AuthGate::new(keys.clone()));
        let internal = Arc::new(InternalGate::new(
            config.security.internal_secret.clone(),
        ));

        let rooms = Arc::new(RoomRegistry::new(
            snapshot_store,
            Arc::clone(&stats),
            Arc::clone(&metrics),
            RoomRuntimeConfig {
                tick_interval: std::time::Duration::from_millis(config.server.tick_interval_ms),
                inbox_capacity: config.server.inbox_capacity,
                session_queue_capacity: config.server.session_queue_capacity,
                code_length: config.server.room_code_length,
                create_attempts: config.server.create_attempts,
            },
        ));

        Self {
            rooms,
            saves,
            stats,
            keys,
            auth,
            internal,
            metrics,
            instance_id: Uuid::new_v4(),
        }
    }
}

/// Public-plane gate: resolve the API key and bind the tenant context
/// before any handler runs.
async fn require_tenant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let tenant = state.auth.resolve(request.headers(), request.uri()).await?;
    request.extensions_mut().insert(tenant);
    Ok(next.run(request).await)
}

/// Internal-plane gate: constant-time shared-secret check.
async fn require_internal(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    state.internal.check(request.headers())?;
    Ok(next.run(request).await)
}

/// Create the Axum router for the whole service.
pub fn create_router(state: AppState, cors_origins: &str) -> Router {
    let cors = parse_cors(cors_origins);

    let public = Router::new()
        .route("/saves", get(saves_api::list_saves))
        .route(
            "/saves/{key}",
            post(saves_api::put_save)
                .get(saves_api::get_save)
                .delete(saves_api::delete_save),
        )
        .route("/rooms", post(rooms_api::create_room))
        .route("/rooms/{code}", get(rooms_api::room_info))
        .route("/rooms/{code}/join", post(rooms_api::join_room))
        .route("/rooms/{code}/ws", get(ws::websocket_handler))
        .route("/stats", get(stats_api::game_stats))
        .route("/stats/track", post(stats_api::track_event))
        .route("/stats/player", get(stats_api::player_stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_tenant,
        ));

    let internal = Router::new()
        .route("/keys", post(keys_api::register_key))
        .route(
            "/keys/{api_key}",
            get(keys_api::inspect_key).delete(keys_api::revoke_key),
        )
        .route("/metrics", get(internal_metrics))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_internal,
        ));

    Router::new()
        .route("/", get(health))
        .nest("/v1", public)
        .nest("/internal", internal)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health/version endpoint; the only unauthenticated route.
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "name": "gamedock-server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
    }))
}

async fn internal_metrics(State(state): State<AppState>) -> Json<crate::metrics::MetricsView> {
    Json(state.metrics.view())
}

fn parse_cors(cors_origins: &str) -> CorsLayer {
    if cors_origins == "*" {
        return CorsLayer::permissive();
    }

    let origins: Vec<_> = cors_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("No valid CORS origins configured, using permissive CORS");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
