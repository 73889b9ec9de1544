//! Database schema bootstrap.
//!
//! Three tables: `users`, `accounts`, and the append-only `transactions`
//! log. The statements are idempotent `CREATE ... IF NOT EXISTS`, applied
//! in order at startup; there is no migration system.

use sqlx::PgPool;

use crate::error::Result;

/// DDL for the `users` table.
pub const CREATE_USERS: &str = "
CREATE TABLE IF NOT EXISTS users (
    id          TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
)";

/// DDL for the `accounts` table.
pub const CREATE_ACCOUNTS: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id          TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL,
    name        TEXT NOT NULL,
    balance     BIGINT NOT NULL DEFAULT 0,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
)";

/// DDL for the `transactions` table.
///
/// `idempotency_key` is UNIQUE so a key collision fails the insert itself
/// with a distinguishable error instead of relying solely on the engine's
/// pre-insert existence check, which runs outside the work transaction.
pub const CREATE_TRANSACTIONS: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id               TEXT PRIMARY KEY,
    idempotency_key  TEXT NOT NULL UNIQUE,
    account_id       TEXT NOT NULL REFERENCES accounts (id),
    amount           BIGINT NOT NULL,
    transaction_type TEXT NOT NULL,
    occurred_at      TIMESTAMPTZ NOT NULL,
    status           TEXT NOT NULL,
    description      TEXT
)";

/// Index backing id-ordered pagination per account.
pub const CREATE_TRANSACTIONS_ACCOUNT_ID_IDX: &str = "
CREATE INDEX IF NOT EXISTS transactions_account_id_id
    ON transactions (account_id, id)";

/// All schema statements, in application order.
#[must_use]
pub fn statements() -> Vec<&'static str> {
    vec![
        CREATE_USERS,
        CREATE_ACCOUNTS,
        CREATE_TRANSACTIONS,
        CREATE_TRANSACTIONS_ACCOUNT_ID_IDX,
    ]
}

/// Apply the schema to the connected database.
///
/// # Errors
///
/// Returns an error if any statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in statements() {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!("schema ensured");
    Ok(())
}
