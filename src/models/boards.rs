use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::referrals::IndirectReferral;
use super::rewards::Reward;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardType {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl BoardType {
    pub const SEQUENCE: [BoardType; 4] = [
        BoardType::Bronze,
        BoardType::Silver,
        BoardType::Gold,
        BoardType::Platinum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BoardType::Bronze => "bronze",
            BoardType::Silver => "silver",
            BoardType::Gold => "gold",
            BoardType::Platinum => "platinum",
        }
    }

    pub fn next(&self) -> BoardStage {
        match self {
            BoardType::Bronze => BoardStage::Silver,
            BoardType::Silver => BoardStage::Gold,
            BoardType::Gold => BoardStage::Platinum,
            BoardType::Platinum => BoardStage::Exit,
        }
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bronze" => Ok(BoardType::Bronze),
            "silver" => Ok(BoardType::Silver),
            "gold" => Ok(BoardType::Gold),
            "platinum" => Ok(BoardType::Platinum),
            other => Err(format!("Unknown board: {other}")),
        }
    }
}

/// Where a user sits in the board sequence. `Exit` follows platinum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardStage {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
    Exit,
}

impl BoardStage {
    pub fn board(&self) -> Option<BoardType> {
        match self {
            BoardStage::Bronze => Some(BoardType::Bronze),
            BoardStage::Silver => Some(BoardType::Silver),
            BoardStage::Gold => Some(BoardType::Gold),
            BoardStage::Platinum => Some(BoardType::Platinum),
            BoardStage::Exit => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self.board() {
            Some(board) => board.as_str(),
            None => "exit",
        }
    }
}

impl From<BoardType> for BoardStage {
    fn from(board: BoardType) -> Self {
        match board {
            BoardType::Bronze => BoardStage::Bronze,
            BoardType::Silver => BoardStage::Silver,
            BoardType::Gold => BoardStage::Gold,
            BoardType::Platinum => BoardStage::Platinum,
        }
    }
}

impl FromStr for BoardStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("exit") {
            return Ok(BoardStage::Exit);
        }
        s.parse::<BoardType>().map(BoardStage::from)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardState {
    NotStarted,
    InProgress,
    Completed,
    RewardClaimed,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct BoardProgressRecord {
    pub board_type: BoardType,
    pub direct_referrals: Vec<String>,
    pub indirect_referrals: Vec<IndirectReferral>,
    pub completed: bool,
    pub completion_date: Option<DateTime<Utc>>,
    pub rewards_claimed: bool,
    pub claimed_option: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl BoardProgressRecord {
    pub fn new(board_type: BoardType) -> Self {
        Self {
            board_type,
            direct_referrals: Vec::new(),
            indirect_referrals: Vec::new(),
            completed: false,
            completion_date: None,
            rewards_claimed: false,
            claimed_option: None,
            claimed_at: None,
        }
    }

    pub fn direct_count(&self) -> usize {
        self.direct_referrals.len()
    }

    pub fn indirect_count(&self) -> usize {
        self.indirect_referrals.len()
    }

    pub fn has_direct(&self, user_id: &str) -> bool {
        self.direct_referrals.iter().any(|id| id == user_id)
    }

    pub fn has_indirect(&self, user_id: &str) -> bool {
        self.indirect_referrals.iter().any(|r| r.user_id == user_id)
    }

    /// True when the id is already counted at either tier of this board.
    pub fn counts(&self, user_id: &str) -> bool {
        self.has_direct(user_id) || self.has_indirect(user_id)
    }

    /// Returns false when the id is already counted on this board.
    pub fn add_direct(&mut self, user_id: &str) -> bool {
        if self.counts(user_id) {
            return false;
        }
        self.direct_referrals.push(user_id.to_string());
        true
    }

    /// Returns false when the id is already counted on this board.
    pub fn add_indirect(&mut self, user_id: &str, level: u32, timestamp: DateTime<Utc>) -> bool {
        if self.counts(user_id) {
            return false;
        }
        self.indirect_referrals.push(IndirectReferral {
            user_id: user_id.to_string(),
            level,
            counted_for_board: self.board_type,
            timestamp,
        });
        true
    }

    pub fn state(&self) -> BoardState {
        if self.rewards_claimed {
            BoardState::RewardClaimed
        } else if self.completed {
            BoardState::Completed
        } else {
            BoardState::InProgress
        }
    }
}

/// Read-only view of one board for a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BoardStatus {
    pub board_type: BoardType,
    pub state: BoardState,
    pub direct_count: usize,
    pub direct_required: usize,
    pub indirect_count: usize,
    pub indirect_required: usize,
    pub completed: bool,
    pub completion_date: Option<DateTime<Utc>>,
    pub rewards_claimed: bool,
    pub claimed_option: Option<String>,
    pub reward: Reward,
}
