use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{bad_path, dispatch, reply, ApiResponse, AppState};
use crate::models::activations::ActivationEvent;
use crate::models::boards::BoardType;
use crate::services::matrix::MatrixRequest;

const DEFAULT_RECONCILE_LIMIT: i64 = 100;

#[derive(Default, Deserialize)]
pub struct ClaimRequest {
    pub reward_option: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct ReconcileRequest {
    pub limit: Option<i64>,
}

/// Called once a plan payment is verified. Replays of the same payment
/// reference answer 200 with a `duplicate` outcome.
pub async fn activate(
    State(state): State<AppState>,
    Json(event): Json<ActivationEvent>,
) -> ApiResponse {
    let result = dispatch(&state, |response| MatrixRequest::Activate { event, response }).await;

    reply(result, StatusCode::OK)
}

pub async fn get_activation(
    State(state): State<AppState>,
    Path(payment_reference): Path<String>,
) -> ApiResponse {
    let result = dispatch(&state, |response| MatrixRequest::GetActivation {
        payment_reference,
        response,
    })
    .await;

    reply(result, StatusCode::OK)
}

pub async fn board_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResponse {
    let result = dispatch(&state, |response| MatrixRequest::BoardStatus {
        user_id,
        response,
    })
    .await;

    reply(result, StatusCode::OK)
}

pub async fn claim_reward(
    State(state): State<AppState>,
    Path((user_id, board)): Path<(String, String)>,
    req: Option<Json<ClaimRequest>>,
) -> ApiResponse {
    let board = match board.parse::<BoardType>() {
        Ok(board) => board,
        Err(e) => return bad_path(e),
    };
    let req = req.map(|Json(req)| req).unwrap_or_default();

    let result = dispatch(&state, |response| MatrixRequest::ClaimReward {
        user_id,
        board,
        reward_option: req.reward_option,
        response,
    })
    .await;

    reply(result, StatusCode::OK)
}

pub async fn reconcile(
    State(state): State<AppState>,
    req: Option<Json<ReconcileRequest>>,
) -> ApiResponse {
    let req = req.map(|Json(req)| req).unwrap_or_default();

    let result = dispatch(&state, |response| MatrixRequest::ReconcilePending {
        limit: req.limit.unwrap_or(DEFAULT_RECONCILE_LIMIT),
        response,
    })
    .await;

    reply(result, StatusCode::OK)
}
