//! Users that own ledger accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Identifier;

/// A user of the ledger; accounts reference users via `owner_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: Identifier,

    /// Contact email address.
    pub email: String,

    /// When the user was created.
    pub created_at: DateTime<Utc>,

    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user record.
    #[must_use]
    pub fn new(id: Identifier, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: email.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
