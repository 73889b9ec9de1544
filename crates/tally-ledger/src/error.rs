//! Error types for the ledger engine.

use tally_store::StoreError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors surfaced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A transaction with the same idempotency key already exists.
    ///
    /// Surfaced distinctly so a caller can treat it as "already applied"
    /// rather than a generic failure.
    #[error("transaction already exists: {key}")]
    DuplicateTransaction {
        /// The colliding idempotency key.
        key: String,
    },

    /// The referenced account does not exist.
    #[error("account not found: {id}")]
    AccountNotFound {
        /// The missing account id.
        id: String,
    },

    /// Infrastructure failure in the storage layer, propagated opaquely and
    /// never retried internally. Deadlocks between concurrent transfers
    /// surface here; callers must retry those.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { key } => Self::DuplicateTransaction { key },
            other => Self::Store(other),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_is_reclassified() {
        let err = LedgerError::from(StoreError::DuplicateKey {
            key: "abc123".into(),
        });
        match err {
            LedgerError::DuplicateTransaction { key } => assert_eq!(key, "abc123"),
            other => panic!("expected DuplicateTransaction, got {other:?}"),
        }
    }

    #[test]
    fn other_store_errors_stay_infrastructure() {
        let err = LedgerError::from(StoreError::InvalidRow {
            column: "status",
            message: "unknown status value: done".into(),
        });
        assert!(matches!(err, LedgerError::Store(_)));
    }
}
