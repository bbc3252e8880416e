use serde::Serialize;

use super::wallets::WalletType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Credit {
    pub wallet: WalletType,
    pub amount: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RewardOption {
    pub label: &'static str,
    pub credits: &'static [Credit],
}

/// Payout attached to a board. `Fixed` pays every credit, `Choice` pays
/// exactly one of the listed options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum Reward {
    Fixed(&'static [Credit]),
    Choice(&'static [RewardOption]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReward {
    pub credits: &'static [Credit],
    pub option: Option<&'static str>,
}

impl Reward {
    pub fn options(&self) -> Vec<&'static str> {
        match self {
            Reward::Fixed(_) => Vec::new(),
            Reward::Choice(options) => options.iter().map(|o| o.label).collect(),
        }
    }

    /// Picks the credits to apply. A label passed for a fixed reward is ignored.
    pub fn resolve(&self, option: Option<&str>) -> Result<ResolvedReward, String> {
        match self {
            Reward::Fixed(credits) => Ok(ResolvedReward {
                credits: *credits,
                option: None,
            }),
            Reward::Choice(options) => {
                let Some(label) = option else {
                    return Err(format!(
                        "a reward option is required, expected one of: {}",
                        self.options().join(", ")
                    ));
                };

                options
                    .iter()
                    .find(|o| o.label.eq_ignore_ascii_case(label.trim()))
                    .map(|o| ResolvedReward {
                        credits: o.credits,
                        option: Some(o.label),
                    })
                    .ok_or_else(|| {
                        format!(
                            "unknown reward option '{label}', expected one of: {}",
                            self.options().join(", ")
                        )
                    })
            }
        }
    }
}
