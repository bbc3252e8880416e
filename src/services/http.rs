use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

use super::matrix::MatrixRequest;
use super::ServiceError;
use crate::matrix::MatrixError;
use crate::models::wallets::WalletError;

mod boards;
mod users;

#[derive(Clone)]
pub struct AppState {
    matrix_channel: mpsc::Sender<MatrixRequest>,
}

type ApiResponse = (StatusCode, Json<Value>);

/// Sends a request to the matrix service and waits for its answer.
async fn dispatch<T, F>(state: &AppState, build: F) -> Result<T, ServiceError>
where
    F: FnOnce(oneshot::Sender<Result<T, ServiceError>>) -> MatrixRequest,
{
    let (response_tx, response_rx) = oneshot::channel();

    state
        .matrix_channel
        .send(build(response_tx))
        .await
        .map_err(|e| ServiceError::Communication("Http => Matrix".to_string(), e.to_string()))?;

    response_rx
        .await
        .map_err(|e| ServiceError::Communication("Matrix => Http".to_string(), e.to_string()))?
}

fn reply<T: Serialize>(result: Result<T, ServiceError>, success: StatusCode) -> ApiResponse {
    match result {
        Ok(body) => (success, Json(json!(body))),
        Err(e) => error_response(&e),
    }
}

fn status_for(err: &MatrixError) -> StatusCode {
    match err {
        MatrixError::NotFound(_) => StatusCode::NOT_FOUND,
        MatrixError::AlreadyClaimed { .. } => StatusCode::CONFLICT,
        MatrixError::NotCompleted { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MatrixError::InvalidOption(_) => StatusCode::BAD_REQUEST,
        MatrixError::DuplicateActivation(_) => StatusCode::OK,
        MatrixError::ConcurrencyConflict(_) => StatusCode::CONFLICT,
        MatrixError::DepthOutOfRange(_) => StatusCode::BAD_REQUEST,
        MatrixError::Wallet(WalletError::InsufficientFunds { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        MatrixError::Wallet(_) => StatusCode::BAD_REQUEST,
        MatrixError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(err: &ServiceError) -> ApiResponse {
    let (status, code) = match err {
        ServiceError::Matrix(e) => (status_for(e), e.code()),
        ServiceError::Communication(..) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };

    if status.is_server_error() {
        log::error!("Request failed: {}", err);
    }

    (
        status,
        Json(json!({
            "error": code,
            "description": err.to_string()
        })),
    )
}

fn bad_path(what: String) -> ApiResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "description": what
        })),
    )
}

pub fn router(matrix_channel: mpsc::Sender<MatrixRequest>) -> Router {
    let app_state = AppState { matrix_channel };

    Router::new()
        .route("/users", post(users::register_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/network", get(users::network_summary))
        .route("/users/{id}/wallets/{wallet}/debit", post(users::debit_wallet))
        .route("/users/{id}/audit", get(users::audit))
        .route("/users/{id}/repair", post(users::repair))
        .route("/users/{id}/boards", get(boards::board_status))
        .route("/users/{id}/boards/{board}/claim", post(boards::claim_reward))
        .route("/activations", post(boards::activate))
        .route("/activations/{reference}", get(boards::get_activation))
        .route("/admin/reconcile", post(boards::reconcile))
        .route("/health", get(|| async { "OK" }))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(
    listen: &str,
    matrix_channel: mpsc::Sender<MatrixRequest>,
) -> Result<(), anyhow::Error> {
    let app = router(matrix_channel);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
