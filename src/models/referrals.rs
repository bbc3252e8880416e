use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::boards::BoardType;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndirectReferral {
    pub user_id: String,
    pub level: u32,
    pub counted_for_board: BoardType,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LevelCount {
    pub level: u32,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NetworkSummary {
    pub user_id: String,
    pub levels: Vec<LevelCount>,
}

/// An activated downline the recount finds but no board has credited.
/// `level` is the upline distance: 1 for a direct referral.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MissingReferral {
    pub user_id: String,
    pub level: u32,
}

/// Recorded board credit compared with a full recount of the downline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    pub user_id: String,
    pub activated_direct: usize,
    pub recorded_direct: usize,
    pub activated_indirect: usize,
    pub recorded_indirect: usize,
    pub missing: Vec<MissingReferral>,
    /// Credited ids the recount cannot reach.
    pub unexpected: Vec<String>,
}

impl DriftReport {
    pub fn has_drift(&self) -> bool {
        !self.missing.is_empty() || !self.unexpected.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepairOutcome {
    pub user_id: String,
    pub board: Option<BoardType>,
    pub added: Vec<String>,
    pub newly_completed: bool,
}
