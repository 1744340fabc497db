//! WebSocket endpoint: upgrade, session pumps, and lifecycle events.
//!
//! The actor owns all room semantics; this module only moves frames. The
//! reader half forwards text frames into the actor inbox, the writer half
//! drains the session's outbound queue onto the socket, and open/close
//! emit `session_start` / `session_end` into the stats accumulator.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Extension;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::error::ApiError;
use super::AppState;
use crate::protocol::{RoomCode, Tenant};
use crate::room::SessionOutbound;
use crate::stats::StatsEvent;

/// Close code used when admission fails after the upgrade completed.
const ADMISSION_FAILED_CLOSE_CODE: u16 = 4004;

/// `GET /v1/rooms/{code}/ws`
pub async fn websocket_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Path(code): Path<String>,
) -> Result<Response, ApiError> {
    let ws = ws.map_err(|_| ApiError::UpgradeRequired)?;
    let code = RoomCode::new(code);

    // Refuse with a proper 404 while this is still plain HTTP; the room
    // can vanish before admission, which then closes the fresh socket.
    state.rooms.info(&tenant.game_id, &code).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, tenant, code)))
}

async fn handle_socket(socket: WebSocket, state: AppState, tenant: Tenant, code: RoomCode) {
    let connected_at = Instant::now();
    state.metrics.increment_total_connections();
    emit_session_event(&state, &tenant, StatsEvent::SessionStart).await;
    tracing::info!(
        game_id = %tenant.game_id,
        code = %code,
        player_id = %tenant.player_id,
        instance_id = %state.instance_id,
        "WebSocket connection established"
    );

    run_session(socket, &state, &tenant, &code).await;

    state.metrics.decrement_active_connections();
    emit_session_event(
        &state,
        &tenant,
        StatsEvent::SessionEnd {
            playtime_secs: Some(connected_at.elapsed().as_secs()),
        },
    )
    .await;
    tracing::info!(
        game_id = %tenant.game_id,
        code = %code,
        player_id = %tenant.player_id,
        "WebSocket connection closed"
    );
}

async fn run_session(mut socket: WebSocket, state: &AppState, tenant: &Tenant, code: &RoomCode) {
    let (outbound_tx, mut outbound_rx) =
        mpsc::channel::<SessionOutbound>(state.rooms.session_queue_capacity());

    let ticket = match state
        .rooms
        .attach(&tenant.game_id, code, &tenant.player_id, outbound_tx)
        .await
    {
        Ok(ticket) => ticket,
        Err(err) => {
            tracing::warn!(
                game_id = %tenant.game_id,
                code = %code,
                player_id = %tenant.player_id,
                error = %err,
                "WebSocket admission refused"
            );
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: ADMISSION_FAILED_CLOSE_CODE,
                    reason: "Room not found".into(),
                })))
                .await;
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();

    // Writer: drain the actor's outbound queue onto the socket. Ends when
    // the actor drops the session (close, replacement, room teardown).
    let writer = tokio::spawn(async move {
        while let Some(outbound) = outbound_rx.recv().await {
            match outbound {
                SessionOutbound::Frame(frame) => {
                    let text = match serde_json::to_string(frame.as_ref()) {
                        Ok(text) => text,
                        Err(err) => {
                            tracing::error!(error = %err, "Failed to serialize server frame");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                SessionOutbound::Close { code, reason } => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
            }
        }
    });

    // Reader: every text frame goes through the actor inbox; everything
    // else is transport noise.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if ticket.frame(text.to_string()).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(
                    player_id = %tenant.player_id,
                    error = %err,
                    "WebSocket read error"
                );
                break;
            }
        }
    }

    ticket.detach().await;
    let _ = writer.await;
}

async fn emit_session_event(state: &AppState, tenant: &Tenant, event: StatsEvent) {
    state.metrics.increment_stats_events();
    if let Err(err) = state
        .stats
        .record(&tenant.game_id, &tenant.player_id, event)
        .await
    {
        state.metrics.increment_stats_failures();
        tracing::warn!(
            game_id = %tenant.game_id,
            error = %err,
            "Failed to record session stats event"
        );
    }
}
