//! Core types for the tally ledger.
//!
//! This crate provides the foundational types used throughout the ledger:
//!
//! - **Identifiers**: [`Identifier`], [`IdGenerator`]: fixed-width,
//!   lexicographically sortable entity keys
//! - **Accounts**: [`Account`]: balance-carrying ledger accounts
//! - **Transactions**: [`Transaction`], [`TransactionType`],
//!   [`TransactionStatus`]: append-only credit/debit entries
//! - **Users**: [`User`]: account owners
//!
//! Amounts are integer minor units stored as `i64` to avoid floating point
//! precision issues.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod ids;
pub mod transaction;
pub mod user;

pub use account::Account;
pub use ids::{IdError, IdGenerator, Identifier, ID_LENGTH};
pub use transaction::{Transaction, TransactionStatus, TransactionType, UnknownVariant};
pub use user::User;
