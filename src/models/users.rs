use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::boards::{BoardProgressRecord, BoardStage, BoardType};
use super::wallets::Wallets;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Basic,
    Classic,
    Deluxe,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Basic => "basic",
            Plan::Classic => "classic",
            Plan::Deluxe => "deluxe",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Plan::Basic),
            "classic" => Ok(Plan::Classic),
            "deluxe" => Ok(Plan::Deluxe),
            other => Err(format!("Unknown plan: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub current_plan: Option<Plan>,
    pub current_board: BoardStage,
    pub board_progress: Vec<BoardProgressRecord>,
    pub wallets: Wallets,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: String, referral_code: String, referred_by: Option<String>) -> Self {
        let now = Utc::now();

        User {
            id,
            referral_code,
            referred_by,
            current_plan: None,
            current_board: BoardStage::default(),
            board_progress: Vec::new(),
            wallets: Wallets::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Only users holding a plan are counted in anyone's referral tally.
    pub fn is_activated(&self) -> bool {
        self.current_plan.is_some()
    }

    pub fn board(&self, board: BoardType) -> Option<&BoardProgressRecord> {
        self.board_progress.iter().find(|r| r.board_type == board)
    }

    /// Creates the record the first time the user lands on a board.
    pub fn board_or_insert(&mut self, board: BoardType) -> &mut BoardProgressRecord {
        let position = match self.board_progress.iter().position(|r| r.board_type == board) {
            Some(position) => position,
            None => {
                self.board_progress.push(BoardProgressRecord::new(board));
                self.board_progress.len() - 1
            }
        };

        &mut self.board_progress[position]
    }

    /// A downline is credited to at most one board, at one tier.
    pub fn counts_referral(&self, user_id: &str) -> bool {
        self.board_progress.iter().any(|r| r.counts(user_id))
    }

    pub fn direct_referral_count(&self) -> usize {
        self.board_progress.iter().map(|r| r.direct_count()).sum()
    }

    pub fn indirect_referral_count(&self) -> usize {
        self.board_progress.iter().map(|r| r.indirect_count()).sum()
    }

    /// Every downline id credited on any board, either tier.
    pub fn counted_referrals(&self) -> impl Iterator<Item = &str> {
        self.board_progress.iter().flat_map(|r| {
            r.direct_referrals
                .iter()
                .map(String::as_str)
                .chain(r.indirect_referrals.iter().map(|i| i.user_id.as_str()))
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewUser {
    pub referral_code: Option<String>,
}
