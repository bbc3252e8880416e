//! Board rule table. This is the only place thresholds, rewards and the
//! propagation depth are defined.

use crate::models::boards::BoardType;
use crate::models::rewards::{Credit, Reward, RewardOption};
use crate::models::wallets::{WalletType, KOBO_PER_NAIRA};

/// Depth of the 7-ary matrix. Indirect credit reaches ancestors up to this
/// many levels above an activated user, and the counter never looks deeper.
pub const MAX_DEPTH: u32 = 7;

/// Matrix width; every board asks for a full first row.
pub const MATRIX_WIDTH: usize = 7;

/// Levels reported by the network summary (0 = direct children).
pub const NETWORK_SUMMARY_LEVELS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardRule {
    pub board: BoardType,
    pub direct_required: usize,
    pub indirect_required: usize,
    pub reward: Reward,
}

const fn naira(amount: i64) -> i64 {
    amount * KOBO_PER_NAIRA
}

const BRONZE_REWARD: &[Credit] = &[Credit {
    wallet: WalletType::Food,
    amount: naira(13_000),
}];

const SILVER_CASH: &[Credit] = &[Credit {
    wallet: WalletType::Cash,
    amount: naira(100_000),
}];

const SILVER_FOOD: &[Credit] = &[Credit {
    wallet: WalletType::Food,
    amount: naira(100_000),
}];

const GOLD_REWARD: &[Credit] = &[
    Credit {
        wallet: WalletType::Cash,
        amount: naira(500_000),
    },
    Credit {
        wallet: WalletType::Gadget,
        amount: naira(250_000),
    },
];

const PLATINUM_CASH: &[Credit] = &[Credit {
    wallet: WalletType::Cash,
    amount: naira(2_000_000),
}];

const PLATINUM_GADGET: &[Credit] = &[Credit {
    wallet: WalletType::Gadget,
    amount: naira(2_000_000),
}];

pub static BOARD_RULES: [BoardRule; 4] = [
    BoardRule {
        board: BoardType::Bronze,
        direct_required: MATRIX_WIDTH,
        indirect_required: 0,
        reward: Reward::Fixed(BRONZE_REWARD),
    },
    BoardRule {
        board: BoardType::Silver,
        direct_required: MATRIX_WIDTH,
        indirect_required: MATRIX_WIDTH * MATRIX_WIDTH,
        reward: Reward::Choice(&[
            RewardOption {
                label: "cash",
                credits: SILVER_CASH,
            },
            RewardOption {
                label: "food",
                credits: SILVER_FOOD,
            },
        ]),
    },
    BoardRule {
        board: BoardType::Gold,
        direct_required: MATRIX_WIDTH,
        indirect_required: MATRIX_WIDTH * MATRIX_WIDTH,
        reward: Reward::Fixed(GOLD_REWARD),
    },
    BoardRule {
        board: BoardType::Platinum,
        direct_required: MATRIX_WIDTH,
        indirect_required: 0,
        reward: Reward::Choice(&[
            RewardOption {
                label: "cash",
                credits: PLATINUM_CASH,
            },
            RewardOption {
                label: "gadget",
                credits: PLATINUM_GADGET,
            },
        ]),
    },
];

pub fn rule_for(board: BoardType) -> &'static BoardRule {
    match board {
        BoardType::Bronze => &BOARD_RULES[0],
        BoardType::Silver => &BOARD_RULES[1],
        BoardType::Gold => &BOARD_RULES[2],
        BoardType::Platinum => &BOARD_RULES[3],
    }
}

impl BoardRule {
    pub fn is_met(&self, direct: usize, indirect: usize) -> bool {
        direct >= self.direct_required && indirect >= self.indirect_required
    }
}
