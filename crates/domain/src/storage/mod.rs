use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Address, Transaction};

/// Common result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Shared, type-erased store handle injected into the pipeline and the API.
pub type SharedTransactionStore = Arc<dyn TransactionStore>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("no transactions recorded for address {0}")]
    NotFound(Address),
}

impl StorageError {
    pub fn from_source(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }
}

/// Address-keyed persistence for matched transactions.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Appends `transactions` to whatever is already recorded for `address`.
    async fn append_transactions(
        &self,
        address: &Address,
        transactions: Vec<Transaction>,
    ) -> StorageResult<()>;

    /// Returns every recorded transaction for `address` in append order, or
    /// [`StorageError::NotFound`] when nothing was ever appended.
    async fn list_transactions(&self, address: &Address) -> StorageResult<Vec<Transaction>>;
}
