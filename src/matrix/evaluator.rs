use chrono::{DateTime, Utc};
use serde::Serialize;

use super::rules::rule_for;
use super::{MatrixEngine, MatrixError};
use crate::models::boards::{BoardProgressRecord, BoardState, BoardStatus, BoardType};
use crate::models::users::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Evaluation {
    InProgress {
        direct_missing: usize,
        indirect_missing: usize,
    },
    NewlyCompleted,
    AlreadyCompleted,
}

impl Evaluation {
    pub fn is_newly_completed(&self) -> bool {
        matches!(self, Evaluation::NewlyCompleted)
    }
}

/// Flips `completed` the first time the board's thresholds are met.
///
/// Completion is monotonic and the completion date is written once. Rewards
/// are not credited here; that waits for an explicit claim.
pub fn evaluate(record: &mut BoardProgressRecord, now: DateTime<Utc>) -> Evaluation {
    if record.completed {
        return Evaluation::AlreadyCompleted;
    }

    let rule = rule_for(record.board_type);
    let direct = record.direct_count();
    let indirect = record.indirect_count();

    if rule.is_met(direct, indirect) {
        record.completed = true;
        record.completion_date = Some(now);
        return Evaluation::NewlyCompleted;
    }

    Evaluation::InProgress {
        direct_missing: rule.direct_required.saturating_sub(direct),
        indirect_missing: rule.indirect_required.saturating_sub(indirect),
    }
}

pub fn board_state(record: Option<&BoardProgressRecord>) -> BoardState {
    record.map_or(BoardState::NotStarted, |r| r.state())
}

pub fn board_status(user: &User, board: BoardType) -> BoardStatus {
    let rule = rule_for(board);
    let record = user.board(board);

    BoardStatus {
        board_type: board,
        state: board_state(record),
        direct_count: record.map_or(0, |r| r.direct_count()),
        direct_required: rule.direct_required,
        indirect_count: record.map_or(0, |r| r.indirect_count()),
        indirect_required: rule.indirect_required,
        completed: record.is_some_and(|r| r.completed),
        completion_date: record.and_then(|r| r.completion_date),
        rewards_claimed: record.is_some_and(|r| r.rewards_claimed),
        claimed_option: record.and_then(|r| r.claimed_option.clone()),
        reward: rule.reward,
    }
}

impl MatrixEngine {
    pub async fn board_status(&self, user_id: &str) -> Result<Vec<BoardStatus>, MatrixError> {
        let user = self.get_user(user_id).await?;

        Ok(BoardType::SEQUENCE
            .iter()
            .map(|board| board_status(&user, *board))
            .collect())
    }
}
