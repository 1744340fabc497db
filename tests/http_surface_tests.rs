//! HTTP surface tests: auth-gate precedence, saves CRUD, stats reads,
//! and the internal key-administration plane.


use axum::body::Body;
use axum::http::{Request, StatusCode};
use gamedock_server::http::create_router;
use serde_json::Value;
use tower::ServiceExt;

use test_helpers::test_state;

struct RequestSpec<'a> {
    method: &'a str,
    uri: &'a str,
    player_id: Option<&'a str>,
    bearer: Option<&'a str>,
    body: Option<&'a str>,
}

async fn send(app: &axum::Router, spec: RequestSpec<'_>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(spec.method).uri(spec.uri);
    if let Some(player_id) = spec.player_id {
        builder = builder.header("X-Player-ID", player_id);
    }
    if let Some(bearer) = spec.bearer {
        builder = builder.header("Authorization", format!("Bearer {bearer}"));
    }
    let request = builder
        .header("content-type", "application/json")
        .body(Body::from(spec.body.unwrap_or("").to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn health_endpoint_requires_no_auth() {
    let state = test_state().await;
    let app = create_router(state, "*");

    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/",
            player_id: None,
            bearer: None,
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "gamedock-server");
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn auth_denial_precedence() {
    let state = test_state().await;
    let app = create_router(state, "*");

    // Missing playerId is checked first.
    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/v1/saves/progress",
            player_id: None,
            bearer: Some("wt_BOGUS"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PlayerIdRequired");

    // Bogus key with a player bound is an unknown-key denial.
    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/v1/saves/progress",
            player_id: Some("p"),
            bearer: Some("wt_BOGUS"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "InvalidKey");

    // No key at all.
    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/v1/saves/progress",
            player_id: Some("p"),
            bearer: None,
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AuthRequired");

    // Wrong prefix.
    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/v1/saves/progress",
            player_id: Some("p"),
            bearer: Some("sk_whoops"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "InvalidKeyFormat");
}

#[tokio::test]
async fn saves_crud_round_trip() {
    let state = test_state().await;
    let app = create_router(state, "*");

    let put = |uri: &'static str, payload: &'static str| RequestSpec {
        method: "POST",
        uri,
        player_id: Some("alice"),
        bearer: Some("wt_ka"),
        body: Some(payload),
    };

    let (status, body) = send(&app, put("/v1/saves/progress", r#"{"level": 3}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["key"], "progress");
    let (status, _) = send(&app, put("/v1/saves/other", r#"{"gold": 10}"#)).await;
    assert_eq!(status, StatusCode::OK);

    // Get returns the stored value bytewise.
    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/v1/saves/progress",
            player_id: Some("alice"),
            bearer: Some("wt_ka"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], "progress");
    assert_eq!(body["data"], serde_json::json!({"level": 3}));

    // List is scoped to the caller.
    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/v1/saves",
            player_id: Some("alice"),
            bearer: Some("wt_ka"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["keys"], serde_json::json!(["other", "progress"]));

    let (_, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/v1/saves",
            player_id: Some("bob"),
            bearer: Some("wt_ka"),
            body: None,
        },
    )
    .await;
    assert_eq!(body["keys"], serde_json::json!([]));

    // Delete, then the key is gone.
    let (status, body) = send(
        &app,
        RequestSpec {
            method: "DELETE",
            uri: "/v1/saves/progress",
            player_id: Some("alice"),
            bearer: Some("wt_ka"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/v1/saves/progress",
            player_id: Some("alice"),
            bearer: Some("wt_ka"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SaveNotFound");
}

#[tokio::test]
async fn save_put_rejects_malformed_json() {
    let state = test_state().await;
    let app = create_router(state, "*");

    let (status, body) = send(
        &app,
        RequestSpec {
            method: "POST",
            uri: "/v1/saves/progress",
            player_id: Some("alice"),
            bearer: Some("wt_ka"),
            body: Some("{not json"),
        },
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BadJSON");
}

#[tokio::test]
async fn room_info_unknown_code_is_not_found() {
    let state = test_state().await;
    let app = create_router(state, "*");

    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/v1/rooms/ZZZZ",
            player_id: Some("alice"),
            bearer: Some("wt_ka"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "RoomNotFound");
}

#[tokio::test]
async fn ws_route_without_upgrade_is_rejected() {
    let state = test_state().await;
    state
        .rooms
        .create_with_code(
            &test_helpers::game(),
            &gamedock_server::protocol::RoomCode::new("HQK3"),
            &test_helpers::player("alice"),
        )
        .await
        .unwrap();
    let app = create_router(state, "*");

    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/v1/rooms/HQK3/ws",
            player_id: Some("alice"),
            bearer: Some("wt_ka"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::UPGRADE_REQUIRED);
    assert_eq!(body["code"], "UpgradeRequired");
}

#[tokio::test]
async fn stats_surface_tracks_and_reads() {
    let state = test_state().await;
    let app = create_router(state, "*");

    let (status, body) = send(
        &app,
        RequestSpec {
            method: "POST",
            uri: "/v1/stats/track",
            player_id: Some("alice"),
            bearer: Some("wt_ka"),
            body: Some(r#"{"event":"session_start"}"#),
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/v1/stats",
            player_id: Some("alice"),
            bearer: Some("wt_ka"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["online"], 1);
    assert_eq!(body["today"], 1);
    assert_eq!(body["total"], 1);
    assert_eq!(body["rooms"], 0);

    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/v1/stats/player",
            player_id: Some("alice"),
            bearer: Some("wt_ka"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"], 1);
    assert!(body["firstSeen"].is_string());

    // Unknown event names are refused.
    let (status, body) = send(
        &app,
        RequestSpec {
            method: "POST",
            uri: "/v1/stats/track",
            player_id: Some("alice"),
            bearer: Some("wt_ka"),
            body: Some(r#"{"event":"levitate"}"#),
        },
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MissingField");
}

#[tokio::test]
async fn internal_plane_requires_the_shared_secret() {
    let state = test_state().await;
    let app = create_router(state, "*");

    // No secret presented.
    let (status, body) = send(
        &app,
        RequestSpec {
            method: "POST",
            uri: "/internal/keys",
            player_id: None,
            bearer: None,
            body: Some(r#"{"apiKey":"wt_new","gameId":"g2","projectId":"p2"}"#),
        },
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "InvalidInternalSecret");

    // Wrong secret.
    let (status, _) = send(
        &app,
        RequestSpec {
            method: "POST",
            uri: "/internal/keys",
            player_id: None,
            bearer: Some("wrong-secret"),
            body: Some(r#"{"apiKey":"wt_new","gameId":"g2","projectId":"p2"}"#),
        },
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Correct secret registers, inspects, revokes.
    let (status, body) = send(
        &app,
        RequestSpec {
            method: "POST",
            uri: "/internal/keys",
            player_id: None,
            bearer: Some("test-internal-secret"),
            body: Some(r#"{"apiKey":"wt_new","gameId":"g2","projectId":"p2"}"#),
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/internal/keys/wt_new",
            player_id: None,
            bearer: Some("test-internal-secret"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);
    assert_eq!(body["gameId"], "g2");
    assert_eq!(body["projectId"], "p2");

    let (status, body) = send(
        &app,
        RequestSpec {
            method: "DELETE",
            uri: "/internal/keys/wt_new",
            player_id: None,
            bearer: Some("test-internal-secret"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/internal/keys/wt_new",
            player_id: None,
            bearer: Some("test-internal-secret"),
            body: None,
        },
    )
    .await;
    assert_eq!(body["exists"], false);
}

#[tokio::test]
async fn internal_key_validation_errors() {
    let state = test_state().await;
    let app = create_router(state, "*");

    // Missing prefix.
    let (status, body) = send(
        &app,
        RequestSpec {
            method: "POST",
            uri: "/internal/keys",
            player_id: None,
            bearer: Some("test-internal-secret"),
            body: Some(r#"{"apiKey":"nope","gameId":"g2","projectId":"p2"}"#),
        },
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BadFormat");

    // Empty gameId.
    let (status, body) = send(
        &app,
        RequestSpec {
            method: "POST",
            uri: "/internal/keys",
            player_id: None,
            bearer: Some("test-internal-secret"),
            body: Some(r#"{"apiKey":"wt_ok","gameId":"","projectId":"p2"}"#),
        },
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MissingField");
}

#[tokio::test]
async fn internal_metrics_exposes_process_counters() {
    let state = test_state().await;
    let app = create_router(state, "*");

    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/internal/metrics",
            player_id: None,
            bearer: Some("test-internal-secret"),
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["active_connections"].is_number());
    assert!(body["rooms_created"].is_number());
}

#[tokio::test]
async fn query_parameter_auth_works_for_public_routes() {
    let state = test_state().await;
    let app = create_router(state, "*");

    let (status, body) = send(
        &app,
        RequestSpec {
            method: "GET",
            uri: "/v1/saves?apiKey=wt_ka&playerId=alice",
            player_id: None,
            bearer: None,
            body: None,
        },
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["keys"], serde_json::json!([]));
}
