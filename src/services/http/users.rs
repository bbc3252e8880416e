use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{bad_path, dispatch, reply, ApiResponse, AppState};
use crate::models::users::NewUser;
use crate::models::wallets::WalletType;
use crate::services::matrix::MatrixRequest;

#[derive(Deserialize)]
pub struct DebitRequest {
    pub amount: i64,
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<NewUser>,
) -> ApiResponse {
    let result = dispatch(&state, |response| MatrixRequest::RegisterUser {
        referral_code: req.referral_code,
        response,
    })
    .await;

    reply(result, StatusCode::CREATED)
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResponse {
    let result = dispatch(&state, |response| MatrixRequest::GetUser {
        id: user_id,
        response,
    })
    .await;

    reply(result, StatusCode::OK)
}

pub async fn network_summary(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResponse {
    let result = dispatch(&state, |response| MatrixRequest::NetworkSummary {
        user_id,
        response,
    })
    .await;

    reply(result, StatusCode::OK)
}

pub async fn debit_wallet(
    State(state): State<AppState>,
    Path((user_id, wallet)): Path<(String, String)>,
    Json(req): Json<DebitRequest>,
) -> ApiResponse {
    let wallet = match wallet.parse::<WalletType>() {
        Ok(wallet) => wallet,
        Err(e) => return bad_path(e),
    };

    let result = dispatch(&state, |response| MatrixRequest::DebitWallet {
        user_id,
        wallet,
        amount: req.amount,
        response,
    })
    .await;

    reply(result, StatusCode::OK)
}

pub async fn audit(State(state): State<AppState>, Path(user_id): Path<String>) -> ApiResponse {
    let result = dispatch(&state, |response| MatrixRequest::Audit { user_id, response }).await;

    reply(result, StatusCode::OK)
}

pub async fn repair(State(state): State<AppState>, Path(user_id): Path<String>) -> ApiResponse {
    let result = dispatch(&state, |response| MatrixRequest::Repair { user_id, response }).await;

    reply(result, StatusCode::OK)
}
