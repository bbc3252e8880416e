use std::sync::Arc;

use uuid::Uuid;

use crate::models::boards::BoardType;
use crate::models::users::User;
use crate::models::wallets::WalletError;
use crate::repositories::{RepositoryError, UserStore};

pub mod counter;
pub mod evaluator;
pub mod ledger;
pub mod locks;
pub mod reconcile;
pub mod rules;
pub mod upline;

use counter::ReferralCounter;
use locks::UserLocks;

const REFERRAL_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum MatrixError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Reward for the {board} board was already claimed by user {user_id}")]
    AlreadyClaimed { user_id: String, board: BoardType },
    #[error("The {board} board is not completed for user {user_id}")]
    NotCompleted { user_id: String, board: BoardType },
    #[error("Invalid reward option: {0}")]
    InvalidOption(String),
    #[error("Payment reference already processed: {0}")]
    DuplicateActivation(String),
    #[error("Concurrent updates on user {0} did not settle")]
    ConcurrencyConflict(String),
    #[error("Depth {0} is outside the matrix")]
    DepthOutOfRange(u32),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl MatrixError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            MatrixError::NotFound(_) => "not_found",
            MatrixError::AlreadyClaimed { .. } => "already_claimed",
            MatrixError::NotCompleted { .. } => "not_completed",
            MatrixError::InvalidOption(_) => "invalid_option",
            MatrixError::DuplicateActivation(_) => "duplicate_activation",
            MatrixError::ConcurrencyConflict(_) => "conflict",
            MatrixError::DepthOutOfRange(_) => "depth_out_of_range",
            MatrixError::Wallet(WalletError::InsufficientFunds { .. }) => "insufficient_funds",
            MatrixError::Wallet(_) => "invalid_amount",
            MatrixError::Repository(_) => "internal",
        }
    }
}

impl From<RepositoryError> for MatrixError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(id) => MatrixError::ConcurrencyConflict(id),
            RepositoryError::NotFound(what) => MatrixError::NotFound(what),
            other => MatrixError::Repository(other),
        }
    }
}

/// Entry point to the referral matrix. Every write to a user record goes
/// through [`MatrixEngine::mutate_user`].
#[derive(Clone)]
pub struct MatrixEngine {
    store: Arc<dyn UserStore>,
    locks: UserLocks,
    counter: ReferralCounter,
    max_retries: u32,
}

impl MatrixEngine {
    pub fn new(store: Arc<dyn UserStore>, max_retries: u32) -> Self {
        let counter = ReferralCounter::new(store.clone());

        Self {
            store,
            locks: UserLocks::new(),
            counter,
            max_retries,
        }
    }

    pub fn counter(&self) -> &ReferralCounter {
        &self.counter
    }

    pub async fn register_user(&self, referral_code: Option<&str>) -> Result<User, MatrixError> {
        let referred_by = match referral_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                let referrer = self
                    .store
                    .get_user_by_referral_code(&code.to_ascii_uppercase())
                    .await?
                    .ok_or_else(|| MatrixError::NotFound(format!("referral code {code}")))?;
                Some(referrer.id)
            }
            None => None,
        };

        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let user = User::new(
                Uuid::new_v4().hyphenated().to_string(),
                generate_referral_code(),
                referred_by.clone(),
            );

            match self.store.insert_user(&user).await {
                Ok(()) => {
                    log::info!(
                        "Registered user {} (referred by {:?})",
                        user.id,
                        user.referred_by
                    );
                    return Ok(user);
                }
                Err(RepositoryError::Duplicate(what)) => {
                    log::debug!("Collision while registering user: {what}");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(MatrixError::Repository(RepositoryError::Duplicate(
            "could not allocate a unique referral code".to_string(),
        )))
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, MatrixError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| MatrixError::NotFound(format!("user {user_id}")))
    }

    /// Load, modify and save one user record under that user's lock.
    ///
    /// `apply` runs against a fresh copy on every attempt; a stale version
    /// from another writer triggers a reload, up to `max_retries` times.
    /// Nothing is written when `apply` leaves the record unchanged.
    pub(crate) async fn mutate_user<T, F>(
        &self,
        user_id: &str,
        mut apply: F,
    ) -> Result<(T, User), MatrixError>
    where
        F: FnMut(&mut User) -> Result<T, MatrixError> + Send,
        T: Send,
    {
        let _guard = self.locks.lock(user_id).await;
        let mut attempt = 0;

        loop {
            let original = self.get_user(user_id).await?;
            let mut user = original.clone();
            let value = apply(&mut user)?;

            if user == original {
                return Ok((value, user));
            }

            match self.store.save_user(&mut user).await {
                Ok(()) => return Ok((value, user)),
                Err(RepositoryError::Conflict(_)) if attempt < self.max_retries => {
                    attempt += 1;
                    log::debug!(
                        "Version conflict on user {user_id}, retrying ({attempt}/{})",
                        self.max_retries
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn generate_referral_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase()
}
