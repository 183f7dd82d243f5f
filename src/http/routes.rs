//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::game::GameStatus;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

const API_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    // Plain request/response routes get a timeout; the upgrade route does not
    let api_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/api/room/:room_id", get(room_handler))
        .layer(TimeoutLayer::new(API_TIMEOUT));

    Router::new()
        .merge(api_routes)
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS: "*" allows any origin, otherwise a comma-separated allow list
fn cors_layer(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    let allowed_origins: Vec<HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    cors.allow_origin(allowed_origins).allow_credentials(true)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    uptime_secs: u64,
    active_rooms: usize,
    active_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: uptime_secs(),
        active_rooms: state.registry.active_rooms(),
        active_players: state.registry.total_players(),
    })
}

// ============================================================================
// Room lookup
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomInfoResponse {
    room_id: String,
    room_name: String,
    player_count: usize,
    max_players: usize,
    game_state: GameStatus,
}

async fn room_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomInfoResponse>, AppError> {
    let room = state
        .registry
        .get(&room_id)
        .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;

    Ok(Json(RoomInfoResponse {
        room_id: room.id.clone(),
        room_name: room.name.clone(),
        player_count: room.player_count(),
        max_players: room.max_players,
        game_state: room.status(),
    }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_room_counts() {
        let state = AppState::new(Config::default());
        state
            .registry
            .create_room(Uuid::new_v4(), "lobby", None)
            .await
            .unwrap();

        let (status, body) = get_json(build_router(state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["activeRooms"], 1);
        assert_eq!(body["activePlayers"], 1);
        assert!(body["timestamp"].is_string());
        assert!(body["uptimeSecs"].is_u64());
    }

    #[tokio::test]
    async fn room_lookup_returns_summary() {
        let state = AppState::new(Config::default());
        let room_id = state
            .registry
            .create_room(Uuid::new_v4(), "lobby", None)
            .await
            .unwrap();

        let (status, body) =
            get_json(build_router(state), &format!("/api/room/{room_id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["roomId"], room_id.as_str());
        assert_eq!(body["roomName"], "lobby");
        assert_eq!(body["playerCount"], 1);
        assert_eq!(body["maxPlayers"], 4);
        assert_eq!(body["gameState"], "waiting");
    }

    #[tokio::test]
    async fn unknown_room_is_404() {
        let state = AppState::new(Config::default());
        let (status, body) = get_json(build_router(state), "/api/room/missing00").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Room not found");
    }
}
