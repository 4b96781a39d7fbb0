use std::sync::Arc;

use ledger_watch_domain::storage::{SharedTransactionStore, StorageResult};
use tracing::info;

use crate::{MemoryStorage, SeaOrmStorage};

/// Picks the transaction store backend: SQL when a database URL is given,
/// in-memory otherwise.
#[derive(Default)]
pub struct StorageBuilder {
    database_url: Option<String>,
}

impl StorageBuilder {
    pub fn new() -> Self {
        Self { database_url: None }
    }

    pub fn database_url(mut self, url: Option<impl Into<String>>) -> Self {
        self.database_url = url.map(Into::into);
        self
    }

    pub async fn build(self) -> StorageResult<SharedTransactionStore> {
        match self.database_url {
            Some(url) => {
                let storage = SeaOrmStorage::connect(&url).await?;
                info!(backend = "sql", "transaction store ready");
                Ok(Arc::new(storage))
            }
            None => {
                info!(backend = "memory", "transaction store ready");
                Ok(Arc::new(MemoryStorage::default()))
            }
        }
    }
}
