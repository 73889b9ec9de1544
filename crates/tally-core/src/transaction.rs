//! Ledger transactions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Identifier;

/// An immutable ledger entry recording a single credit or debit.
///
/// Rows are append-only: once inserted they are never mutated or deleted.
/// `amount` is a non-negative magnitude; the sign is carried by
/// `transaction_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier; strictly increasing in insertion
    /// order, which is what id-based pagination relies on.
    pub id: Identifier,

    /// Derived key rejecting accidental re-execution; unique across all
    /// transactions.
    pub idempotency_key: String,

    /// The account this entry applies to.
    pub account_id: Identifier,

    /// Magnitude of the movement in minor units; never negative.
    pub amount: i64,

    /// Whether the entry adds to or subtracts from the balance.
    pub transaction_type: TransactionType,

    /// When the movement occurred.
    pub occurred_at: DateTime<Utc>,

    /// Lifecycle status of the entry.
    pub status: TransactionStatus,

    /// Caller-supplied description, if any.
    pub description: Option<String>,
}

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Adds to the account balance.
    Credit,

    /// Subtracts from the account balance.
    Debit,
}

impl TransactionType {
    /// The stored text form of this variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    /// Signed multiplier applied to `amount` when summing a balance.
    #[must_use]
    pub const fn sign(self) -> i64 {
        match self {
            Self::Credit => 1,
            Self::Debit => -1,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            other => Err(UnknownVariant {
                field: "transaction_type",
                value: other.to_owned(),
            }),
        }
    }
}

/// Lifecycle status of a ledger entry.
///
/// The engine only ever inserts `complete` rows; `pending` and `failed`
/// exist for out-of-band workflows that stage or void entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Recorded but not yet applied to a balance.
    Pending,

    /// Applied; counted by balance reconstruction.
    Complete,

    /// Voided; kept for audit.
    Failed,
}

impl TransactionStatus {
    /// The stored text form of this variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownVariant {
                field: "status",
                value: other.to_owned(),
            }),
        }
    }
}

/// Error returned when a stored enum value matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {field} value: {value}")]
pub struct UnknownVariant {
    /// The field whose value failed to parse.
    pub field: &'static str,

    /// The unrecognized value.
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_text_roundtrip() {
        for kind in [TransactionType::Credit, TransactionType::Debit] {
            assert_eq!(kind.as_str().parse::<TransactionType>().unwrap(), kind);
        }
        assert!("transfer".parse::<TransactionType>().is_err());
    }

    #[test]
    fn status_text_roundtrip() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Complete,
            TransactionStatus::Failed,
        ] {
            assert_eq!(
                status.as_str().parse::<TransactionStatus>().unwrap(),
                status
            );
        }
        assert!("done".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn sign_orients_amounts() {
        assert_eq!(TransactionType::Credit.sign() * 100, 100);
        assert_eq!(TransactionType::Debit.sign() * 100, -100);
    }
}
