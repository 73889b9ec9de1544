//! SQL statements composed by the ledger engine.
//!
//! Functions taking `&mut PgConnection` must be called on a connection
//! borrowed from an open [`sqlx::Transaction`]; any row lock they acquire
//! is held until that transaction commits or rolls back, so release on
//! every exit path comes from the transaction guard itself.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row};

use tally_core::{Account, Identifier, Transaction, TransactionType, User};

use crate::error::{Result, StoreError};
use crate::rows::{AccountRow, TransactionRow};

/// Insert a user row.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub async fn insert_user(pool: &PgPool, user: &User) -> Result<()> {
    sqlx::query("INSERT INTO users (id, email, created_at, updated_at) VALUES ($1, $2, $3, $4)")
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert an account row.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub async fn insert_account(pool: &PgPool, account: &Account) -> Result<()> {
    sqlx::query(
        "INSERT INTO accounts (id, owner_id, name, balance, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(account.id.as_str())
    .bind(account.owner_id.as_str())
    .bind(&account.name)
    .bind(account.balance)
    .bind(account.created_at)
    .bind(account.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert a transaction row.
///
/// # Errors
///
/// A unique violation surfaces as [`StoreError::DuplicateKey`]; the only
/// unique constraints on the table are the primary key (collision odds are
/// negligible by construction) and `idempotency_key`.
pub async fn insert_transaction(conn: &mut PgConnection, entry: &Transaction) -> Result<()> {
    let result = sqlx::query(
        "INSERT INTO transactions
             (id, idempotency_key, account_id, amount, transaction_type,
              occurred_at, status, description)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(entry.id.as_str())
    .bind(&entry.idempotency_key)
    .bind(entry.account_id.as_str())
    .bind(entry.amount)
    .bind(entry.transaction_type.as_str())
    .bind(entry.occurred_at)
    .bind(entry.status.as_str())
    .bind(entry.description.as_deref())
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Err(StoreError::DuplicateKey {
                key: entry.idempotency_key.clone(),
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Fetch an account by id.
///
/// # Errors
///
/// Returns an error if the statement fails or the row fails to decode.
pub async fn fetch_account(pool: &PgPool, account_id: Identifier) -> Result<Option<Account>> {
    let row: Option<AccountRow> = sqlx::query_as(
        "SELECT id, owner_id, name, balance, created_at, updated_at
         FROM accounts
         WHERE id = $1",
    )
    .bind(account_id.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(Account::try_from).transpose()
}

/// Read an account's balance under an exclusive row lock.
///
/// Returns `None` when the account does not exist. The lock is held from
/// this read until the enclosing transaction ends; a concurrent caller
/// blocks here until the holder commits or rolls back.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub async fn balance_for_update(
    conn: &mut PgConnection,
    account_id: Identifier,
) -> Result<Option<i64>> {
    let row = sqlx::query("SELECT balance FROM accounts WHERE id = $1 FOR UPDATE")
        .bind(account_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|row| row.try_get::<i64, _>("balance"))
        .transpose()
        .map_err(Into::into)
}

/// Write a freshly computed balance for a locked account row.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub async fn update_balance(
    conn: &mut PgConnection,
    account_id: Identifier,
    balance: i64,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE accounts SET balance = $1, updated_at = $2 WHERE id = $3")
        .bind(balance)
        .bind(updated_at)
        .bind(account_id.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Whether any transaction already carries the given idempotency key.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub async fn idempotency_key_exists(pool: &PgPool, key: &str) -> Result<bool> {
    let row = sqlx::query("SELECT count(1) AS hits FROM transactions WHERE idempotency_key = $1")
        .bind(key)
        .fetch_one(pool)
        .await?;
    let hits: i64 = row.try_get("hits")?;
    Ok(hits > 0)
}

/// Fetch an ascending-id page of an account's transactions strictly after
/// `cursor` (pass the empty string for "from the beginning").
///
/// # Errors
///
/// Returns an error if the statement fails or a row fails to decode.
pub async fn transactions_page(
    pool: &PgPool,
    account_id: Identifier,
    cursor: &str,
    limit: i64,
) -> Result<Vec<Transaction>> {
    let rows: Vec<TransactionRow> = sqlx::query_as(
        "SELECT id, idempotency_key, account_id, amount, transaction_type,
                occurred_at, status, description
         FROM transactions
         WHERE account_id = $1 AND id > $2
         ORDER BY id ASC
         LIMIT $3",
    )
    .bind(account_id.as_str())
    .bind(cursor)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Transaction::try_from).collect()
}

/// Signed-amount inputs for balance reconstruction: every transaction on
/// the account with `occurred_at` at or before `as_of`.
///
/// # Errors
///
/// Returns an error if the statement fails or a row fails to decode.
pub async fn signed_amounts(
    pool: &PgPool,
    account_id: Identifier,
    as_of: DateTime<Utc>,
) -> Result<Vec<(i64, TransactionType)>> {
    let rows = sqlx::query(
        "SELECT amount, transaction_type FROM transactions
         WHERE account_id = $1 AND occurred_at <= $2",
    )
    .bind(account_id.as_str())
    .bind(as_of)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| -> Result<(i64, TransactionType)> {
            let amount: i64 = row.try_get("amount")?;
            let kind: String = row.try_get("transaction_type")?;
            let kind = kind
                .parse::<TransactionType>()
                .map_err(|err| StoreError::InvalidRow {
                    column: "transaction_type",
                    message: err.to_string(),
                })?;
            Ok((amount, kind))
        })
        .collect()
}
