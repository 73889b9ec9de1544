//! Ledger accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Identifier;

/// A ledger account.
///
/// `balance` is a denormalized running total of the account's `complete`
/// transactions, mutated only while the storage layer holds an exclusive
/// lock on the account row. The transaction log remains the derivable
/// source of truth; see the engine's balance query for the point-in-time
/// reconstruction. Accounts are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier.
    pub id: Identifier,

    /// The user that owns this account.
    pub owner_id: Identifier,

    /// Human-readable account name.
    pub name: String,

    /// Cached running balance in minor units.
    pub balance: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with a zero balance.
    #[must_use]
    pub fn new(id: Identifier, owner_id: Identifier, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner_id,
            name: name.into(),
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
