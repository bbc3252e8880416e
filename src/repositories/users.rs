use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use super::{RepositoryError, UserStore};
use crate::models::activations::{ActivationRecord, ActivationStatus};
use crate::models::boards::{BoardProgressRecord, BoardStage};
use crate::models::users::{Plan, User};
use crate::models::wallets::Wallets;

const USER_COLUMNS: &str = "id, referral_code, referred_by, current_plan, current_board, \
     board_progress, cash_wallet, food_wallet, gadget_wallet, version, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    referral_code: String,
    referred_by: Option<String>,
    current_plan: Option<String>,
    current_board: String,
    board_progress: Json<Vec<BoardProgressRecord>>,
    cash_wallet: i64,
    food_wallet: i64,
    gadget_wallet: i64,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let current_plan = row
            .current_plan
            .map(|plan| plan.parse::<Plan>())
            .transpose()
            .map_err(RepositoryError::InvalidData)?;
        let current_board = row
            .current_board
            .parse::<BoardStage>()
            .map_err(RepositoryError::InvalidData)?;

        Ok(User {
            id: row.id,
            referral_code: row.referral_code,
            referred_by: row.referred_by,
            current_plan,
            current_board,
            board_progress: row.board_progress.0,
            wallets: Wallets {
                cash: row.cash_wallet,
                food: row.food_wallet,
                gadget: row.gadget_wallet,
            },
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ActivationRow {
    payment_reference: String,
    user_id: String,
    plan: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ActivationRow> for ActivationRecord {
    type Error = RepositoryError;

    fn try_from(row: ActivationRow) -> Result<Self, Self::Error> {
        Ok(ActivationRecord {
            payment_reference: row.payment_reference,
            user_id: row.user_id,
            plan: row.plan.parse().map_err(RepositoryError::InvalidData)?,
            status: row.status.parse().map_err(RepositoryError::InvalidData)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(Clone)]
pub struct PgUserStore {
    conn: PgPool,
}

impl PgUserStore {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
                INSERT INTO users
                (id, referral_code, referred_by, current_plan, current_board, board_progress,
                 cash_wallet, food_wallet, gadget_wallet, version, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&user.id)
        .bind(&user.referral_code)
        .bind(&user.referred_by)
        .bind(user.current_plan.map(|p| p.as_str()))
        .bind(user.current_board.as_str())
        .bind(Json(&user.board_progress))
        .bind(user.wallets.cash)
        .bind(user.wallets.food)
        .bind(user.wallets.gadget)
        .bind(user.version)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.conn)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(RepositoryError::Duplicate(format!(
                "user {} / referral code {}",
                user.id, user.referral_code
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.conn)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_user_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE referral_code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.conn)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn children(&self, parent_ids: &[String]) -> Result<Vec<User>, RepositoryError> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE referred_by = ANY($1) \
             ORDER BY created_at, id"
        ))
        .bind(parent_ids)
        .fetch_all(&self.conn)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn save_user(&self, user: &mut User) -> Result<(), RepositoryError> {
        let updated: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
                UPDATE users SET
                    current_plan = $3,
                    current_board = $4,
                    board_progress = $5,
                    cash_wallet = $6,
                    food_wallet = $7,
                    gadget_wallet = $8,
                    version = version + 1,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1 AND version = $2
                RETURNING version, updated_at
            "#,
        )
        .bind(&user.id)
        .bind(user.version)
        .bind(user.current_plan.map(|p| p.as_str()))
        .bind(user.current_board.as_str())
        .bind(Json(&user.board_progress))
        .bind(user.wallets.cash)
        .bind(user.wallets.food)
        .bind(user.wallets.gadget)
        .fetch_optional(&self.conn)
        .await?;

        if let Some((version, updated_at)) = updated {
            user.version = version;
            user.updated_at = updated_at;
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(&user.id)
            .fetch_one(&self.conn)
            .await?;

        if exists {
            Err(RepositoryError::Conflict(user.id.clone()))
        } else {
            Err(RepositoryError::NotFound(format!("user {}", user.id)))
        }
    }

    async fn insert_activation(&self, record: &ActivationRecord) -> Result<(), RepositoryError> {
        let inserted = sqlx::query(
            r#"
                INSERT INTO activations
                (payment_reference, user_id, plan, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (payment_reference) DO NOTHING
            "#,
        )
        .bind(&record.payment_reference)
        .bind(&record.user_id)
        .bind(record.plan.as_str())
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.conn)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(RepositoryError::Duplicate(format!(
                "payment reference {}",
                record.payment_reference
            )));
        }

        Ok(())
    }

    async fn update_activation_status(
        &self,
        payment_reference: &str,
        status: ActivationStatus,
    ) -> Result<(), RepositoryError> {
        let updated = sqlx::query(
            "UPDATE activations SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE payment_reference = $2",
        )
        .bind(status.as_str())
        .bind(payment_reference)
        .execute(&self.conn)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "activation {payment_reference}"
            )));
        }

        Ok(())
    }

    async fn get_activation(
        &self,
        payment_reference: &str,
    ) -> Result<Option<ActivationRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, ActivationRow>(
            "SELECT * FROM activations WHERE payment_reference = $1",
        )
        .bind(payment_reference)
        .fetch_optional(&self.conn)
        .await?;

        row.map(ActivationRecord::try_from).transpose()
    }

    async fn unsettled_activations(
        &self,
        limit: i64,
    ) -> Result<Vec<ActivationRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, ActivationRow>(
            "SELECT * FROM activations WHERE status <> 'propagated' ORDER BY created_at LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.conn)
        .await?;

        rows.into_iter().map(ActivationRecord::try_from).collect()
    }
}
