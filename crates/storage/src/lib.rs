//! Storage adapters that satisfy the domain [`TransactionStore`] contract.
//! The in-memory store is the default; a SeaORM-backed store (SQLite by
//! default, PostgreSQL via feature flag) is selected when a database URL is
//! configured.

mod builder;
mod entity;
mod memory;
mod migration;
mod transaction_store;

use std::sync::Arc;

use ledger_watch_domain::storage::{StorageError, StorageResult};
use migration::run_migrations;
use sea_orm::{Database, DatabaseConnection};

pub use builder::StorageBuilder;
pub use ledger_watch_domain::storage::{SharedTransactionStore, TransactionStore};
pub use memory::MemoryStorage;

/// Shared SQL storage handle.
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStorage {
    /// Connects to the provided database URL and ensures the schema is present.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let db = Database::connect(database_url)
            .await
            .map_err(StorageError::from_source)?;
        run_migrations(&db).await?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }
}
