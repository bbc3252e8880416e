use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::matrix::ledger::ClaimReceipt;
use crate::matrix::reconcile::ReconcileSummary;
use crate::matrix::upline::ActivationOutcome;
use crate::matrix::MatrixEngine;
use crate::models::activations::{ActivationEvent, ActivationRecord};
use crate::models::boards::{BoardStatus, BoardType};
use crate::models::referrals::{DriftReport, NetworkSummary, RepairOutcome};
use crate::models::users::User;
use crate::models::wallets::{WalletType, Wallets};

type Reply<T> = oneshot::Sender<Result<T, ServiceError>>;

pub enum MatrixRequest {
    RegisterUser {
        referral_code: Option<String>,
        response: Reply<User>,
    },
    GetUser {
        id: String,
        response: Reply<User>,
    },
    Activate {
        event: ActivationEvent,
        response: Reply<ActivationOutcome>,
    },
    GetActivation {
        payment_reference: String,
        response: Reply<ActivationRecord>,
    },
    BoardStatus {
        user_id: String,
        response: Reply<Vec<BoardStatus>>,
    },
    ClaimReward {
        user_id: String,
        board: BoardType,
        reward_option: Option<String>,
        response: Reply<ClaimReceipt>,
    },
    NetworkSummary {
        user_id: String,
        response: Reply<NetworkSummary>,
    },
    DebitWallet {
        user_id: String,
        wallet: WalletType,
        amount: i64,
        response: Reply<Wallets>,
    },
    Audit {
        user_id: String,
        response: Reply<DriftReport>,
    },
    Repair {
        user_id: String,
        response: Reply<RepairOutcome>,
    },
    ReconcilePending {
        limit: i64,
        response: Reply<ReconcileSummary>,
    },
}

#[derive(Clone)]
pub struct MatrixRequestHandler {
    engine: MatrixEngine,
}

impl MatrixRequestHandler {
    pub fn new(engine: MatrixEngine) -> Self {
        MatrixRequestHandler { engine }
    }

    pub async fn start_reconcile_task(&self, every: Duration, batch_size: i64) {
        let engine = self.engine.clone();
        let every = every.max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);

            loop {
                interval.tick().await;

                if let Err(e) = engine.reconcile_pending(batch_size).await {
                    log::error!("Error reconciling activations: {}", e);
                }
            }
        });

        log::info!("Reconcile task started (every {:?})", every);
    }
}

#[async_trait]
impl RequestHandler<MatrixRequest> for MatrixRequestHandler {
    async fn handle_request(&self, request: MatrixRequest) {
        let engine = &self.engine;

        match request {
            MatrixRequest::RegisterUser {
                referral_code,
                response,
            } => {
                let result = engine.register_user(referral_code.as_deref()).await;
                let _ = response.send(result.map_err(ServiceError::from));
            }
            MatrixRequest::GetUser { id, response } => {
                let result = engine.get_user(&id).await;
                let _ = response.send(result.map_err(ServiceError::from));
            }
            MatrixRequest::Activate { event, response } => {
                let result = engine.activate(&event).await;
                let _ = response.send(result.map_err(ServiceError::from));
            }
            MatrixRequest::GetActivation {
                payment_reference,
                response,
            } => {
                let result = engine.get_activation(&payment_reference).await;
                let _ = response.send(result.map_err(ServiceError::from));
            }
            MatrixRequest::BoardStatus { user_id, response } => {
                let result = engine.board_status(&user_id).await;
                let _ = response.send(result.map_err(ServiceError::from));
            }
            MatrixRequest::ClaimReward {
                user_id,
                board,
                reward_option,
                response,
            } => {
                let result = engine
                    .claim_reward(&user_id, board, reward_option.as_deref())
                    .await;
                let _ = response.send(result.map_err(ServiceError::from));
            }
            MatrixRequest::NetworkSummary { user_id, response } => {
                let result = engine.network_summary(&user_id).await;
                let _ = response.send(result.map_err(ServiceError::from));
            }
            MatrixRequest::DebitWallet {
                user_id,
                wallet,
                amount,
                response,
            } => {
                let result = engine.debit_wallet(&user_id, wallet, amount).await;
                let _ = response.send(result.map_err(ServiceError::from));
            }
            MatrixRequest::Audit { user_id, response } => {
                let result = engine.audit(&user_id).await;
                let _ = response.send(result.map_err(ServiceError::from));
            }
            MatrixRequest::Repair { user_id, response } => {
                let result = engine.repair(&user_id).await;
                let _ = response.send(result.map_err(ServiceError::from));
            }
            MatrixRequest::ReconcilePending { limit, response } => {
                let result = engine.reconcile_pending(limit).await;
                let _ = response.send(result.map_err(ServiceError::from));
            }
        }
    }
}

pub struct MatrixService;

impl MatrixService {
    pub fn new() -> Self {
        MatrixService {}
    }
}

impl Default for MatrixService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Service<MatrixRequest, MatrixRequestHandler> for MatrixService {}
