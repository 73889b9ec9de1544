//! PostgreSQL storage layer for the tally ledger.
//!
//! This crate provides everything between the ledger engine and the
//! database:
//!
//! - [`db`]: pool configuration and connection bootstrap
//! - [`schema`]: idempotent DDL for `users`, `accounts`, `transactions`
//! - [`rows`]: `FromRow` types and their decoding into domain types
//! - [`queries`]: the statement set the engine composes into transactions,
//!   including the `SELECT ... FOR UPDATE` row-lock primitives
//!
//! # Locking contract
//!
//! Mutual exclusion on an account's balance is an exclusive row lock taken
//! by [`queries::balance_for_update`] inside a caller-owned
//! [`sqlx::Transaction`]. The lock spans from that read to the balance
//! write and is released when the transaction commits or rolls back;
//! dropping the transaction guard rolls back, so no exit path leaks a lock.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod db;
pub mod error;
pub mod queries;
pub mod rows;
pub mod schema;

pub use db::{connect, DatabaseConfig};
pub use error::{Result, StoreError};
