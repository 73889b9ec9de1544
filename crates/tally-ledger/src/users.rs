//! User directory.

use std::sync::Arc;

use sqlx::PgPool;

use tally_core::{IdGenerator, User};
use tally_store::queries;

use crate::error::Result;

/// Creates and stores the users that own ledger accounts.
#[derive(Clone)]
pub struct Users {
    pool: PgPool,
    ids: Arc<IdGenerator>,
}

impl Users {
    /// Create a directory with its own identifier generator.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self::with_generator(pool, Arc::new(IdGenerator::new()))
    }

    /// Create a directory sharing an existing identifier generator.
    #[must_use]
    pub fn with_generator(pool: PgPool, ids: Arc<IdGenerator>) -> Self {
        Self { pool, ids }
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Fails only on a storage-layer error.
    pub async fn create_user(&self, email: &str) -> Result<User> {
        let user = User::new(self.ids.mint(), email);
        queries::insert_user(&self.pool, &user).await?;
        tracing::info!(user = %user.id, "user created");
        Ok(user)
    }
}
