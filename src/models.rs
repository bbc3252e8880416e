pub mod activations;
pub mod boards;
pub mod referrals;
pub mod rewards;
pub mod users;
pub mod wallets;
