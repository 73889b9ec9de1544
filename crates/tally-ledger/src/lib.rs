//! The tally ledger engine.
//!
//! This crate implements the transactional core of the ledger:
//!
//! - Account creation, deposits, withdrawals, and atomic transfers
//! - Point-in-time balance reconstruction from the transaction log
//! - Cursor-based, id-ordered history pagination
//! - A user directory for account owners
//!
//! # Consistency model
//!
//! Every money-moving operation runs inside one database transaction and
//! mutates the account's cached balance only under an exclusive row lock
//! held from the balance read to the balance write. Transaction rows are
//! append-only and carry identifiers that increase in insertion order, so
//! a page cursor is just the last id seen. Idempotency keys are derived
//! from a live timestamp, which limits deduplication to same-instant
//! re-execution; see [`Ledger::deposit`] and DESIGN.md for the caveats.
//!
//! The request layer (wire decoding, input validation, transport) and
//! database provisioning are collaborators, not part of this crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod engine;
pub mod error;
pub mod users;

pub use engine::{Ledger, TransactionPage, TransferReceipt, DEFAULT_PAGE_SIZE};
pub use error::{LedgerError, Result};
pub use users::Users;
