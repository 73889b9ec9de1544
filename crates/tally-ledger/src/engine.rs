//! The ledger engine.
//!
//! Orchestrates account creation, deposits, withdrawals, transfers, balance
//! queries, and paginated history on top of the storage layer. Every
//! money-moving operation runs inside a single database transaction; the
//! engine itself is stateless and holds no in-process locks beyond the
//! identifier generator's counter and entropy pool.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Transaction as DbTransaction};

use tally_core::{
    Account, IdGenerator, Identifier, Transaction, TransactionStatus, TransactionType,
};
use tally_store::queries;

use crate::error::{LedgerError, Result};

/// Default number of rows returned by [`Ledger::list_transactions`].
pub const DEFAULT_PAGE_SIZE: usize = 15;

/// Truncated length of derived idempotency keys.
const IDEMPOTENCY_KEY_LEN: usize = 32;

/// A page of transactions plus the cursor for the next page.
#[derive(Debug, Clone)]
pub struct TransactionPage {
    /// Transactions in ascending id order, at most the requested page size.
    pub transactions: Vec<Transaction>,

    /// Id of the last returned row, present only when more rows exist.
    /// Pass it back as the exclusive cursor for the next page.
    pub next_cursor: Option<Identifier>,
}

/// The two legs of a completed transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    /// Debit recorded against the source account.
    pub debit: Transaction,

    /// Credit recorded against the destination account.
    pub credit: Transaction,
}

/// The transactional ledger engine.
///
/// Stateless and reentrant: any number of operations may run concurrently,
/// each owning its own request-scoped database transaction. Mutual
/// exclusion on an account's balance is delegated to the storage layer via
/// exclusive row locks, so operations on different accounts never block
/// each other, and operations on the same account serialize on its row.
#[derive(Clone)]
pub struct Ledger {
    pool: PgPool,
    ids: Arc<IdGenerator>,
}

impl Ledger {
    /// Create an engine with its own identifier generator.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self::with_generator(pool, Arc::new(IdGenerator::new()))
    }

    /// Create an engine sharing an existing identifier generator.
    #[must_use]
    pub fn with_generator(pool: PgPool, ids: Arc<IdGenerator>) -> Self {
        Self { pool, ids }
    }

    /// Create a new account with a zero balance.
    ///
    /// # Errors
    ///
    /// Fails only on a storage-layer error.
    pub async fn create_account(&self, owner_id: Identifier, name: &str) -> Result<Account> {
        let account = Account::new(self.ids.mint(), owner_id, name);
        queries::insert_account(&self.pool, &account).await?;
        tracing::info!(account = %account.id, owner = %owner_id, "account created");
        Ok(account)
    }

    /// Record a credit against an account and raise its balance, atomically.
    ///
    /// `amount` must be a positive magnitude; validating caller input is the
    /// request layer's responsibility, not checked here.
    ///
    /// # Errors
    ///
    /// [`LedgerError::DuplicateTransaction`] when the derived idempotency
    /// key already exists, [`LedgerError::AccountNotFound`] when the account
    /// row is missing, [`LedgerError::Store`] on any storage failure. Any
    /// failure rolls back the entire operation.
    pub async fn deposit(
        &self,
        account_id: Identifier,
        amount: i64,
        description: &str,
    ) -> Result<Transaction> {
        self.record_entry(account_id, amount, TransactionType::Credit, description)
            .await
    }

    /// Record a debit against an account and lower its balance, atomically.
    ///
    /// No overdraft check is performed; balances may go negative. Overdraft
    /// policy belongs to the caller's domain rules.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Ledger::deposit`].
    pub async fn withdraw(
        &self,
        account_id: Identifier,
        amount: i64,
        description: &str,
    ) -> Result<Transaction> {
        self.record_entry(account_id, amount, TransactionType::Debit, description)
            .await
    }

    /// Move `amount` from `source_id` to `dest_id` in one transaction,
    /// recording a debit on the source and a credit on the destination.
    ///
    /// Row locks are acquired source first, then destination, with no
    /// canonical ordering by account id: two concurrent transfers moving
    /// funds in opposite directions between the same pair of accounts can
    /// deadlock. The database aborts one of them and the failure surfaces
    /// as [`LedgerError::Store`]; callers must be prepared to retry.
    ///
    /// # Errors
    ///
    /// [`LedgerError::DuplicateTransaction`] when either leg's idempotency
    /// key already exists (checked before any lock is taken),
    /// [`LedgerError::AccountNotFound`] when either account row is missing,
    /// [`LedgerError::Store`] on any storage failure. Any failure rolls
    /// back both legs.
    pub async fn transfer(
        &self,
        source_id: Identifier,
        dest_id: Identifier,
        amount: i64,
        description: &str,
    ) -> Result<TransferReceipt> {
        let debit_key =
            derive_idempotency_key(source_id, amount, TransactionType::Debit, Utc::now());
        let credit_key =
            derive_idempotency_key(dest_id, amount, TransactionType::Credit, Utc::now());
        self.ensure_unused(&debit_key).await?;
        self.ensure_unused(&credit_key).await?;

        let mut tx = self.pool.begin().await?;
        self.apply_balance_change(&mut tx, source_id, TransactionType::Debit, amount)
            .await?;
        self.apply_balance_change(&mut tx, dest_id, TransactionType::Credit, amount)
            .await?;

        let debit = self.build_entry(
            source_id,
            amount,
            TransactionType::Debit,
            debit_key,
            description,
        );
        let credit = self.build_entry(
            dest_id,
            amount,
            TransactionType::Credit,
            credit_key,
            description,
        );
        queries::insert_transaction(&mut tx, &debit).await?;
        queries::insert_transaction(&mut tx, &credit).await?;
        tx.commit().await?;

        tracing::info!(source = %source_id, dest = %dest_id, amount, "transfer complete");
        Ok(TransferReceipt { debit, credit })
    }

    /// Return up to `page_size` of the account's transactions in ascending
    /// id order, strictly after `cursor` when one is given.
    ///
    /// Fetches one row beyond the page size to detect a further page
    /// without a second round trip; when more rows exist,
    /// [`TransactionPage::next_cursor`] is the id of the last returned row.
    ///
    /// # Errors
    ///
    /// Fails only on a storage-layer error.
    pub async fn list_transactions(
        &self,
        account_id: Identifier,
        cursor: Option<Identifier>,
        page_size: usize,
    ) -> Result<TransactionPage> {
        let after = cursor.map(|c| c.to_string()).unwrap_or_default();
        let limit = i64::try_from(page_size).unwrap_or(i64::MAX).saturating_add(1);
        let rows = queries::transactions_page(&self.pool, account_id, &after, limit).await?;
        Ok(trim_page(rows, page_size))
    }

    /// The account balance reconstructed from the transaction log: the
    /// signed sum of every transaction with `occurred_at` at or before
    /// `as_of`, defaulting to now.
    ///
    /// This is a derived value, independent of the cached
    /// `accounts.balance` column. The two normally agree, but nothing here
    /// reconciles them: if an out-of-band write makes them diverge, that is
    /// a data-integrity problem to investigate, not to mask.
    ///
    /// # Errors
    ///
    /// Fails only on a storage-layer error.
    pub async fn get_balance(
        &self,
        account_id: Identifier,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        let as_of = as_of.unwrap_or_else(Utc::now);
        let amounts = queries::signed_amounts(&self.pool, account_id, as_of).await?;
        Ok(amounts
            .into_iter()
            .map(|(amount, kind)| kind.sign() * amount)
            .sum())
    }

    /// Shared body of deposit and withdraw.
    async fn record_entry(
        &self,
        account_id: Identifier,
        amount: i64,
        kind: TransactionType,
        description: &str,
    ) -> Result<Transaction> {
        let key = derive_idempotency_key(account_id, amount, kind, Utc::now());
        self.ensure_unused(&key).await?;

        let mut tx = self.pool.begin().await?;
        self.apply_balance_change(&mut tx, account_id, kind, amount)
            .await?;

        let entry = self.build_entry(account_id, amount, kind, key, description);
        queries::insert_transaction(&mut tx, &entry).await?;
        tx.commit().await?;

        tracing::info!(
            account = %account_id,
            amount,
            kind = kind.as_str(),
            "ledger entry recorded"
        );
        Ok(entry)
    }

    /// Pre-flight idempotency check.
    ///
    /// Runs as its own statement before the work transaction opens, so two
    /// concurrent calls deriving the same key can both pass; the UNIQUE
    /// constraint on the column catches that race at insert time and is
    /// reported as the same duplicate failure.
    async fn ensure_unused(&self, key: &str) -> Result<()> {
        if queries::idempotency_key_exists(&self.pool, key).await? {
            return Err(LedgerError::DuplicateTransaction {
                key: key.to_owned(),
            });
        }
        Ok(())
    }

    /// Lock the account row, then write the balance adjusted by the signed
    /// amount. The lock persists until `tx` commits or rolls back.
    async fn apply_balance_change(
        &self,
        tx: &mut DbTransaction<'_, Postgres>,
        account_id: Identifier,
        kind: TransactionType,
        amount: i64,
    ) -> Result<()> {
        let balance = queries::balance_for_update(&mut *tx, account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound {
                id: account_id.to_string(),
            })?;
        let balance = balance + kind.sign() * amount;
        queries::update_balance(&mut *tx, account_id, balance, Utc::now()).await?;
        Ok(())
    }

    fn build_entry(
        &self,
        account_id: Identifier,
        amount: i64,
        kind: TransactionType,
        idempotency_key: String,
        description: &str,
    ) -> Transaction {
        Transaction {
            id: self.ids.mint(),
            idempotency_key,
            account_id,
            amount,
            transaction_type: kind,
            occurred_at: Utc::now(),
            status: TransactionStatus::Complete,
            description: Some(description.to_owned()),
        }
    }
}

/// Derive the idempotency key for one ledger entry.
///
/// Hashes `account_id ‖ amount ‖ timestamp ‖ type` and truncates the hex
/// digest to 32 characters. The timestamp carries nanosecond precision, so
/// two calls with identical intent issued at different instants produce
/// different keys: only an exact same-instant re-execution or a digest
/// collision is caught, not a retried client request.
fn derive_idempotency_key(
    account_id: Identifier,
    amount: i64,
    kind: TransactionType,
    at: DateTime<Utc>,
) -> String {
    let stamp = at.to_rfc3339_opts(SecondsFormat::Nanos, true);
    let mut hasher = Sha256::new();
    hasher.update(account_id.as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.update(stamp.as_bytes());
    hasher.update(kind.as_str().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..IDEMPOTENCY_KEY_LEN].to_owned()
}

/// Trim an over-fetched page and derive the next cursor.
fn trim_page(mut rows: Vec<Transaction>, page_size: usize) -> TransactionPage {
    if rows.len() > page_size {
        rows.truncate(page_size);
        let next_cursor = rows.last().map(|entry| entry.id);
        TransactionPage {
            transactions: rows,
            next_cursor,
        }
    } else {
        TransactionPage {
            transactions: rows,
            next_cursor: None,
        }
    }
}
