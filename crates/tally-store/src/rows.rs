//! Row types bridging SQL results and domain types.
//!
//! Identifiers and enums are stored as text, so every read goes through a
//! fallible conversion; a value that fails to parse surfaces as
//! [`StoreError::InvalidRow`] rather than being masked.

use chrono::{DateTime, Utc};

use tally_core::{Account, Identifier, Transaction};

use crate::error::StoreError;

/// Raw `accounts` row.
#[derive(Debug, sqlx::FromRow)]
pub struct AccountRow {
    /// `id` column.
    pub id: String,

    /// `owner_id` column.
    pub owner_id: String,

    /// `name` column.
    pub name: String,

    /// `balance` column.
    pub balance: i64,

    /// `created_at` column.
    pub created_at: DateTime<Utc>,

    /// `updated_at` column.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id("id", &row.id)?,
            owner_id: parse_id("owner_id", &row.owner_id)?,
            name: row.name,
            balance: row.balance,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Raw `transactions` row.
#[derive(Debug, sqlx::FromRow)]
pub struct TransactionRow {
    /// `id` column.
    pub id: String,

    /// `idempotency_key` column.
    pub idempotency_key: String,

    /// `account_id` column.
    pub account_id: String,

    /// `amount` column.
    pub amount: i64,

    /// `transaction_type` column.
    pub transaction_type: String,

    /// `occurred_at` column.
    pub occurred_at: DateTime<Utc>,

    /// `status` column.
    pub status: String,

    /// `description` column.
    pub description: Option<String>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id("id", &row.id)?,
            idempotency_key: row.idempotency_key,
            account_id: parse_id("account_id", &row.account_id)?,
            amount: row.amount,
            transaction_type: parse_text("transaction_type", &row.transaction_type)?,
            occurred_at: row.occurred_at,
            status: parse_text("status", &row.status)?,
            description: row.description,
        })
    }
}

fn parse_id(column: &'static str, value: &str) -> Result<Identifier, StoreError> {
    Identifier::from_string(value).map_err(|err| StoreError::InvalidRow {
        column,
        message: err.to_string(),
    })
}

fn parse_text<T>(column: &'static str, value: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|err: T::Err| StoreError::InvalidRow {
        column,
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{IdGenerator, TransactionStatus, TransactionType};

    fn transaction_row(ids: &IdGenerator) -> TransactionRow {
        TransactionRow {
            id: ids.mint().to_string(),
            idempotency_key: "a".repeat(32),
            account_id: ids.mint().to_string(),
            amount: 100,
            transaction_type: "credit".into(),
            occurred_at: Utc::now(),
            status: "complete".into(),
            description: None,
        }
    }

    #[test]
    fn transaction_row_decodes() {
        let ids = IdGenerator::new();
        let entry = Transaction::try_from(transaction_row(&ids)).unwrap();
        assert_eq!(entry.transaction_type, TransactionType::Credit);
        assert_eq!(entry.status, TransactionStatus::Complete);
    }

    #[test]
    fn unknown_transaction_type_is_invalid_row() {
        let ids = IdGenerator::new();
        let mut row = transaction_row(&ids);
        row.transaction_type = "transfer".into();
        match Transaction::try_from(row) {
            Err(StoreError::InvalidRow { column, .. }) => {
                assert_eq!(column, "transaction_type");
            }
            other => panic!("expected InvalidRow, got {other:?}"),
        }
    }

    #[test]
    fn malformed_id_is_invalid_row() {
        let row = AccountRow {
            id: "not-an-id".into(),
            owner_id: "also-bad".into(),
            name: "checking".into(),
            balance: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        match Account::try_from(row) {
            Err(StoreError::InvalidRow { column, .. }) => assert_eq!(column, "id"),
            other => panic!("expected InvalidRow, got {other:?}"),
        }
    }
}
