use chrono::{DateTime, Utc};
use serde::Serialize;

use super::rules::rule_for;
use super::{MatrixEngine, MatrixError};
use crate::models::boards::{BoardStage, BoardType};
use crate::models::rewards::Credit;
use crate::models::users::User;
use crate::models::wallets::{WalletType, Wallets};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimReceipt {
    pub user_id: String,
    pub board: BoardType,
    pub claimed_option: Option<String>,
    pub credited: Vec<Credit>,
    pub wallets: Wallets,
    pub current_board: BoardStage,
    pub claimed_at: DateTime<Utc>,
}

/// Pays out a completed board and moves the user to the next one.
///
/// All credits land or none do. A board can be paid once; the record is
/// read-only afterwards.
pub fn issue_reward(
    user: &mut User,
    board: BoardType,
    option: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ClaimReceipt, MatrixError> {
    let not_completed = || MatrixError::NotCompleted {
        user_id: user.id.clone(),
        board,
    };

    let index = user
        .board_progress
        .iter()
        .position(|r| r.board_type == board)
        .ok_or_else(not_completed)?;

    let record = &user.board_progress[index];
    if record.rewards_claimed {
        return Err(MatrixError::AlreadyClaimed {
            user_id: user.id.clone(),
            board,
        });
    }
    if !record.completed {
        return Err(not_completed());
    }

    let resolved = rule_for(board)
        .reward
        .resolve(option)
        .map_err(MatrixError::InvalidOption)?;

    let mut wallets = user.wallets;
    for credit in resolved.credits {
        wallets.credit(credit.wallet, credit.amount)?;
    }
    user.wallets = wallets;

    let record = &mut user.board_progress[index];
    record.rewards_claimed = true;
    record.claimed_at = Some(now);
    record.claimed_option = resolved.option.map(String::from);

    if user.current_board.board() == Some(board) {
        user.current_board = board.next();
    }

    Ok(ClaimReceipt {
        user_id: user.id.clone(),
        board,
        claimed_option: user.board_progress[index].claimed_option.clone(),
        credited: resolved.credits.to_vec(),
        wallets: user.wallets,
        current_board: user.current_board,
        claimed_at: now,
    })
}

impl MatrixEngine {
    pub async fn claim_reward(
        &self,
        user_id: &str,
        board: BoardType,
        option: Option<&str>,
    ) -> Result<ClaimReceipt, MatrixError> {
        let now = Utc::now();
        let (receipt, _) = self
            .mutate_user(user_id, |user| issue_reward(user, board, option, now))
            .await?;

        log::info!(
            "User {} claimed {} board reward (option {:?}), now on {}",
            receipt.user_id,
            board,
            receipt.claimed_option,
            receipt.current_board.as_str()
        );

        Ok(receipt)
    }

    pub async fn debit_wallet(
        &self,
        user_id: &str,
        wallet: WalletType,
        amount: i64,
    ) -> Result<Wallets, MatrixError> {
        let (wallets, _) = self
            .mutate_user(user_id, |user| {
                user.wallets.debit(wallet, amount)?;
                Ok(user.wallets)
            })
            .await?;

        log::info!("Debited {amount} from {wallet} wallet of user {user_id}");
        Ok(wallets)
    }
}
