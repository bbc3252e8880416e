use async_trait::async_trait;

use crate::models::activations::{ActivationRecord, ActivationStatus};
use crate::models::users::User;

pub mod memory;
pub mod users;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Stale write rejected for user {0}")]
    Conflict(String),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Duplicate record: {0}")]
    Duplicate(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Persistence for user records and the activation ledger.
///
/// `save_user` is a compare-and-swap on `User::version`: it fails with
/// `RepositoryError::Conflict` when the stored version differs from the one
/// the caller loaded, and bumps the version on success.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError>;

    async fn get_user_by_referral_code(&self, code: &str)
        -> Result<Option<User>, RepositoryError>;

    /// Users whose `referred_by` is one of `parent_ids`, activated or not.
    async fn children(&self, parent_ids: &[String]) -> Result<Vec<User>, RepositoryError>;

    async fn save_user(&self, user: &mut User) -> Result<(), RepositoryError>;

    /// Fails with `RepositoryError::Duplicate` when the payment reference is known.
    async fn insert_activation(&self, record: &ActivationRecord) -> Result<(), RepositoryError>;

    async fn update_activation_status(
        &self,
        payment_reference: &str,
        status: ActivationStatus,
    ) -> Result<(), RepositoryError>;

    async fn get_activation(
        &self,
        payment_reference: &str,
    ) -> Result<Option<ActivationRecord>, RepositoryError>;

    /// Activations not yet fully propagated, oldest first.
    async fn unsettled_activations(
        &self,
        limit: i64,
    ) -> Result<Vec<ActivationRecord>, RepositoryError>;
}
