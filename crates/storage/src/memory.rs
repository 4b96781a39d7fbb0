use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use async_trait::async_trait;
use ledger_watch_domain::model::{Address, Transaction};
use ledger_watch_domain::storage::{StorageError, StorageResult, TransactionStore};

/// Process-local store with no durability.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    transactions: RwLock<HashMap<Address, Vec<Transaction>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for MemoryStorage {
    async fn append_transactions(
        &self,
        address: &Address,
        transactions: Vec<Transaction>,
    ) -> StorageResult<()> {
        let mut guard = self
            .transactions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard
            .entry(address.clone())
            .or_default()
            .extend(transactions);
        Ok(())
    }

    async fn list_transactions(&self, address: &Address) -> StorageResult<Vec<Transaction>> {
        self.transactions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(address.clone()))
    }
}
