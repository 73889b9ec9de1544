//! Live-database integration tests for the ledger engine.
//!
//! These run against a real PostgreSQL instance. Point `DATABASE_URL` (or
//! the `PG*` variables read by `DatabaseConfig::from_env`) at a scratch
//! database and run with:
//!
//! ```text
//! cargo test -p tally-ledger --test ledger -- --ignored
//! ```

use chrono::Utc;
use sqlx::{PgPool, Row};

use tally_core::{
    IdGenerator, Identifier, Transaction, TransactionStatus, TransactionType,
};
use tally_ledger::{Ledger, Users};
use tally_store::{connect, queries, schema, DatabaseConfig, StoreError};

struct Harness {
    pool: PgPool,
    ledger: Ledger,
    users: Users,
    ids: IdGenerator,
}

async fn harness() -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let config = DatabaseConfig::from_env();
    let pool = connect(&config).await.expect("database unavailable");
    schema::ensure_schema(&pool)
        .await
        .expect("schema bootstrap failed");

    Harness {
        ledger: Ledger::new(pool.clone()),
        users: Users::new(pool.clone()),
        pool,
        ids: IdGenerator::new(),
    }
}

impl Harness {
    /// A brand-new account owned by a brand-new user.
    async fn fresh_account(&self) -> Identifier {
        let email = format!("{}@example.test", self.ids.mint());
        let user = self.users.create_user(&email).await.expect("create user");
        let account = self
            .ledger
            .create_account(user.id, "checking")
            .await
            .expect("create account");
        assert_eq!(account.balance, 0);
        account.id
    }

    /// The denormalized `accounts.balance` column, read directly.
    async fn cached_balance(&self, account_id: Identifier) -> i64 {
        queries::fetch_account(&self.pool, account_id)
            .await
            .expect("account query")
            .expect("account row")
            .balance
    }
}

#[tokio::test]
#[ignore] // requires a live database
async fn deposit_then_withdraw_reaches_expected_balance() {
    let h = harness().await;
    let account_id = h.fresh_account().await;

    h.ledger
        .deposit(account_id, 100, "opening deposit")
        .await
        .unwrap();
    h.ledger
        .withdraw(account_id, 40, "card payment")
        .await
        .unwrap();

    assert_eq!(h.ledger.get_balance(account_id, None).await.unwrap(), 60);
    // The cached running total and the log-derived balance agree under
    // normal operation; they are still independent values.
    assert_eq!(h.cached_balance(account_id).await, 60);

    let page = h
        .ledger
        .list_transactions(account_id, None, 10)
        .await
        .unwrap();
    assert_eq!(page.transactions.len(), 2);
    assert!(page.next_cursor.is_none());
    assert!(page
        .transactions
        .iter()
        .all(|entry| entry.status == TransactionStatus::Complete));
}

#[tokio::test]
#[ignore] // requires a live database
async fn withdrawals_may_overdraw() {
    let h = harness().await;
    let account_id = h.fresh_account().await;

    // No overdraft check by design; the balance simply goes negative.
    h.ledger
        .withdraw(account_id, 40, "overdraft")
        .await
        .unwrap();
    assert_eq!(h.ledger.get_balance(account_id, None).await.unwrap(), -40);
    assert_eq!(h.cached_balance(account_id).await, -40);
}

#[tokio::test]
#[ignore] // requires a live database
async fn transfer_moves_funds_between_accounts() {
    let h = harness().await;
    let source = h.fresh_account().await;
    let dest = h.fresh_account().await;
    h.ledger.deposit(source, 100, "seed").await.unwrap();

    let receipt = h.ledger.transfer(source, dest, 50, "rent").await.unwrap();

    assert_eq!(receipt.debit.account_id, source);
    assert_eq!(receipt.debit.transaction_type, TransactionType::Debit);
    assert_eq!(receipt.credit.account_id, dest);
    assert_eq!(receipt.credit.transaction_type, TransactionType::Credit);
    assert_eq!(receipt.debit.amount, receipt.credit.amount);
    assert_ne!(receipt.debit.id, receipt.credit.id);
    assert_ne!(receipt.debit.idempotency_key, receipt.credit.idempotency_key);
    assert_eq!(receipt.debit.description, receipt.credit.description);

    assert_eq!(h.ledger.get_balance(source, None).await.unwrap(), 50);
    assert_eq!(h.ledger.get_balance(dest, None).await.unwrap(), 50);
    assert_eq!(h.cached_balance(source).await, 50);
    assert_eq!(h.cached_balance(dest).await, 50);
}

#[tokio::test]
#[ignore] // requires a live database
async fn pagination_walks_all_transactions() {
    let h = harness().await;
    let account_id = h.fresh_account().await;
    for amount in 1..=5 {
        h.ledger.deposit(account_id, amount, "seed").await.unwrap();
    }

    let first = h
        .ledger
        .list_transactions(account_id, None, 2)
        .await
        .unwrap();
    assert_eq!(first.transactions.len(), 2);
    let cursor = first.next_cursor.expect("a second page exists");

    let second = h
        .ledger
        .list_transactions(account_id, Some(cursor), 2)
        .await
        .unwrap();
    assert_eq!(second.transactions.len(), 2);
    let cursor = second.next_cursor.expect("a third page exists");

    let third = h
        .ledger
        .list_transactions(account_id, Some(cursor), 2)
        .await
        .unwrap();
    assert_eq!(third.transactions.len(), 1);
    assert!(third.next_cursor.is_none());

    // The walk covers every row exactly once, in insertion order.
    let pages = [first, second, third];
    let ids: Vec<Identifier> = pages
        .iter()
        .flat_map(|page| page.transactions.iter().map(|entry| entry.id))
        .collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(ids.len(), 5);
    assert_eq!(ids, sorted);

    let amounts: Vec<i64> = pages
        .iter()
        .flat_map(|page| page.transactions.iter().map(|entry| entry.amount))
        .collect();
    assert_eq!(amounts, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
#[ignore] // requires a live database
async fn concurrent_deposits_do_not_lose_updates() {
    let h = harness().await;
    let account_id = h.fresh_account().await;

    let (first, second) = tokio::join!(
        h.ledger.deposit(account_id, 10, "first"),
        h.ledger.deposit(account_id, 20, "second"),
    );
    first.unwrap();
    second.unwrap();

    assert_eq!(h.ledger.get_balance(account_id, None).await.unwrap(), 30);
    assert_eq!(h.cached_balance(account_id).await, 30);
}

#[tokio::test]
#[ignore] // requires a live database
async fn duplicate_idempotency_key_persists_once() {
    let h = harness().await;
    let account_id = h.fresh_account().await;
    // Minted ids are unique per run, so the padded key never collides with
    // leftovers from earlier runs.
    let shared_key = format!("{:0>32}", h.ids.mint());

    let entry = |h: &Harness| Transaction {
        id: h.ids.mint(),
        idempotency_key: shared_key.clone(),
        account_id,
        amount: 5,
        transaction_type: TransactionType::Credit,
        occurred_at: Utc::now(),
        status: TransactionStatus::Complete,
        description: None,
    };
    let first = entry(&h);
    let second = entry(&h);

    let mut tx = h.pool.begin().await.unwrap();
    queries::insert_transaction(&mut tx, &first).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = h.pool.begin().await.unwrap();
    let err = queries::insert_transaction(&mut tx, &second)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey { .. }));
    drop(tx); // rolls back

    let row = sqlx::query("SELECT count(1) AS hits FROM transactions WHERE idempotency_key = $1")
        .bind(&shared_key)
        .fetch_one(&h.pool)
        .await
        .unwrap();
    let hits: i64 = row.get("hits");
    assert_eq!(hits, 1);
}

#[tokio::test]
#[ignore] // requires a live database
async fn balance_as_of_reconstructs_history() {
    let h = harness().await;
    let account_id = h.fresh_account().await;

    h.ledger.deposit(account_id, 100, "initial").await.unwrap();
    let checkpoint = Utc::now();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    h.ledger.deposit(account_id, 50, "later").await.unwrap();

    assert_eq!(
        h.ledger
            .get_balance(account_id, Some(checkpoint))
            .await
            .unwrap(),
        100
    );
    assert_eq!(h.ledger.get_balance(account_id, None).await.unwrap(), 150);
}
