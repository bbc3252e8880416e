use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::users::Plan;

/// A verified plan payment. `payment_reference` is the idempotency key.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActivationEvent {
    pub user_id: String,
    pub plan: Plan,
    pub payment_reference: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationStatus {
    Pending,
    Propagated,
    Partial,
}

impl ActivationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationStatus::Pending => "pending",
            ActivationStatus::Propagated => "propagated",
            ActivationStatus::Partial => "partial",
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, ActivationStatus::Propagated)
    }
}

impl fmt::Display for ActivationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ActivationStatus::Pending),
            "propagated" => Ok(ActivationStatus::Propagated),
            "partial" => Ok(ActivationStatus::Partial),
            other => Err(format!("Unknown activation status: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActivationRecord {
    pub payment_reference: String,
    pub user_id: String,
    pub plan: Plan,
    pub status: ActivationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActivationRecord {
    pub fn pending(event: &ActivationEvent) -> Self {
        let now = Utc::now();

        ActivationRecord {
            payment_reference: event.payment_reference.clone(),
            user_id: event.user_id.clone(),
            plan: event.plan,
            status: ActivationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}
