use std::future::Future;
use std::net::SocketAddr;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use common::protocol::{
    CreateMatchRequest, MessageResponse, MoveRequest, PlayerActionRequest, RegisterDeviceRequest,
    WaitingResponse,
};
use common::{DeviceId, MatchId};
use serde::de::DeserializeOwned;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::error::{GameError, GameErrorKind, ServerError};
use crate::game_service::GameService;
use crate::match_manager::MatchRequestOutcome;

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            GameErrorKind::NotFound => StatusCode::NOT_FOUND,
            GameErrorKind::Forbidden | GameErrorKind::InvalidTurn => StatusCode::FORBIDDEN,
            GameErrorKind::OutOfBounds
            | GameErrorKind::CellOccupied
            | GameErrorKind::AlreadyFinished
            | GameErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        };
        (status, Json(MessageResponse::new(self.to_string()))).into_response()
    }
}

/// Decodes an optional JSON body; an empty body yields `T::default()`.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, GameError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| GameError::BadRequest(e.to_string()))
}

pub fn build_router(service: GameService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/devices", post(register_device).get(list_devices))
        .route("/devices/{device_id}/info", get(device_info))
        .route("/devices/{device_id}/stats/reset", post(reset_stats))
        .route("/devices/{device_id}/match", get(device_match))
        .route("/matches", post(create_match))
        .route("/matches/{match_id}", get(match_state))
        .route("/matches/{match_id}/moves", post(make_move))
        .route("/matches/{match_id}/leave", post(leave_match))
        .route("/matches/{match_id}/surrender", post(surrender))
        .layer(cors)
        .with_state(service)
}

pub async fn run_web_server(
    service: GameService,
    bind_address: &str,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let addr: SocketAddr = bind_address
        .parse()
        .map_err(|source| ServerError::BadAddress {
            address: bind_address.to_string(),
            source,
        })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            address: bind_address.to_string(),
            source,
        })?;
    info!("Web server listening on {}", addr);

    axum::serve(listener, build_router(service))
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(ServerError::Serve)
}

async fn register_device(State(service): State<GameService>, body: Bytes) -> Response {
    // Registration never fails; an unreadable body just means no alias.
    let request: RegisterDeviceRequest = parse_body(&body).unwrap_or_default();
    let response = service.register_device(request).await;
    (StatusCode::CREATED, Json(response)).into_response()
}

async fn list_devices(State(service): State<GameService>) -> Response {
    Json(service.list_devices().await).into_response()
}

async fn device_info(
    State(service): State<GameService>,
    Path(device_id): Path<DeviceId>,
) -> Result<Response, GameError> {
    Ok(Json(service.device_info(&device_id).await?).into_response())
}

async fn reset_stats(
    State(service): State<GameService>,
    Path(device_id): Path<DeviceId>,
) -> Result<Response, GameError> {
    Ok(Json(service.reset_stats(&device_id).await?).into_response())
}

async fn device_match(
    State(service): State<GameService>,
    Path(device_id): Path<DeviceId>,
) -> Result<Response, GameError> {
    Ok(Json(service.active_match(&device_id).await?).into_response())
}

async fn create_match(
    State(service): State<GameService>,
    body: Bytes,
) -> Result<Response, GameError> {
    let request: CreateMatchRequest = parse_body(&body)?;
    let response = match service.request_match(request).await? {
        MatchRequestOutcome::Paired(summary) => (StatusCode::CREATED, Json(summary)).into_response(),
        MatchRequestOutcome::Waiting { board_size } => (
            StatusCode::ACCEPTED,
            Json(WaitingResponse {
                message: format!(
                    "Waiting for an opponent for a {}x{} board",
                    board_size, board_size
                ),
                board_size,
            }),
        )
            .into_response(),
    };
    Ok(response)
}

async fn match_state(
    State(service): State<GameService>,
    Path(match_id): Path<MatchId>,
) -> Result<Response, GameError> {
    Ok(Json(service.match_state(&match_id).await?).into_response())
}

async fn make_move(
    State(service): State<GameService>,
    Path(match_id): Path<MatchId>,
    body: Bytes,
) -> Result<Response, GameError> {
    let request: MoveRequest = parse_body(&body)?;
    Ok(Json(service.make_move(&match_id, request).await?).into_response())
}

async fn leave_match(
    State(service): State<GameService>,
    Path(match_id): Path<MatchId>,
    body: Bytes,
) -> Result<Response, GameError> {
    let request: PlayerActionRequest = parse_body(&body)?;
    Ok(Json(service.leave_match(&match_id, request).await?).into_response())
}

async fn surrender(
    State(service): State<GameService>,
    Path(match_id): Path<MatchId>,
    body: Bytes,
) -> Result<Response, GameError> {
    let request: PlayerActionRequest = parse_body(&body)?;
    Ok(Json(service.surrender(&match_id, request).await?).into_response())
}
