//! Error types for tally storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database rejected or failed a statement. Includes connectivity
    /// loss, lock timeouts, constraint violations other than the
    /// idempotency key, and deadlock aborts.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An insert hit the unique constraint on `idempotency_key`.
    #[error("duplicate idempotency key: {key}")]
    DuplicateKey {
        /// The key that already exists.
        key: String,
    },

    /// A stored value could not be decoded into its domain type.
    #[error("invalid row data in {column}: {message}")]
    InvalidRow {
        /// Column whose value failed to decode.
        column: &'static str,

        /// Decode failure detail.
        message: String,
    },
}
