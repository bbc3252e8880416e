use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Amounts are held in kobo.
pub const KOBO_PER_NAIRA: i64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
    Cash,
    Food,
    Gadget,
}

impl WalletType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletType::Cash => "cash",
            WalletType::Food => "food",
            WalletType::Gadget => "gadget",
        }
    }
}

impl fmt::Display for WalletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cash" => Ok(WalletType::Cash),
            "food" => Ok(WalletType::Food),
            "gadget" => Ok(WalletType::Gadget),
            other => Err(format!("Unknown wallet: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(i64),
    #[error("Insufficient funds in {wallet} wallet: balance {balance}, requested {requested}")]
    InsufficientFunds {
        wallet: WalletType,
        balance: i64,
        requested: i64,
    },
    #[error("Balance overflow in {0} wallet")]
    Overflow(WalletType),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Wallets {
    pub cash: i64,
    pub food: i64,
    pub gadget: i64,
}

impl Wallets {
    pub fn balance(&self, wallet: WalletType) -> i64 {
        match wallet {
            WalletType::Cash => self.cash,
            WalletType::Food => self.food,
            WalletType::Gadget => self.gadget,
        }
    }

    fn slot_mut(&mut self, wallet: WalletType) -> &mut i64 {
        match wallet {
            WalletType::Cash => &mut self.cash,
            WalletType::Food => &mut self.food,
            WalletType::Gadget => &mut self.gadget,
        }
    }

    /// Returns the new balance.
    pub fn credit(&mut self, wallet: WalletType, amount: i64) -> Result<i64, WalletError> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        let slot = self.slot_mut(wallet);
        *slot = slot
            .checked_add(amount)
            .ok_or(WalletError::Overflow(wallet))?;

        Ok(*slot)
    }

    /// Returns the new balance. Balances never go below zero.
    pub fn debit(&mut self, wallet: WalletType, amount: i64) -> Result<i64, WalletError> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        let slot = self.slot_mut(wallet);
        if *slot < amount {
            return Err(WalletError::InsufficientFunds {
                wallet,
                balance: *slot,
                requested: amount,
            });
        }
        *slot -= amount;

        Ok(*slot)
    }
}
