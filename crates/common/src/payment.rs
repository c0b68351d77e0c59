use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settlement state of a payment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Payment has been recorded but not yet settled.
    Pending,
    /// The tendered amount covered the order total.
    Paid,
    /// The tendered amount could not cover the order total.
    Failed,
}

impl PaymentStatus {
    pub const PENDING: &'static str = "pending";
    pub const PAID: &'static str = "paid";
    pub const FAILED: &'static str = "failed";

    /// Returns the canonical lowercase name stored alongside a transaction.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => Self::PENDING,
            PaymentStatus::Paid => Self::PAID,
            PaymentStatus::Failed => Self::FAILED,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of `pending`, `paid` or `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid payment status: {0:?} (expected pending, paid or failed)")]
pub struct ParsePaymentStatusError(pub String);

impl FromStr for PaymentStatus {
    type Err = ParsePaymentStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::PENDING => Ok(PaymentStatus::Pending),
            Self::PAID => Ok(PaymentStatus::Paid),
            Self::FAILED => Ok(PaymentStatus::Failed),
            other => Err(ParsePaymentStatusError(other.to_string())),
        }
    }
}
