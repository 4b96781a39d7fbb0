use ledger_watch_domain::model::{Address, Transaction};
use ledger_watch_domain::storage::{StorageError, StorageResult, TransactionStore};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::entity::watched_transactions;
use crate::SeaOrmStorage;

#[async_trait::async_trait]
impl TransactionStore for SeaOrmStorage {
    async fn append_transactions(
        &self,
        address: &Address,
        transactions: Vec<Transaction>,
    ) -> StorageResult<()> {
        if transactions.is_empty() {
            return Ok(());
        }

        let recorded_at = Utc::now();
        let models = transactions
            .into_iter()
            .map(|tx| watched_transactions::ActiveModel {
                address: Set(address.as_str().to_owned()),
                tx_hash: Set(tx.hash),
                from_address: Set(tx.from.into_inner()),
                to_address: Set(tx.to.map(Address::into_inner)),
                block_timestamp: Set(tx.timestamp),
                recorded_at: Set(recorded_at),
                ..Default::default()
            });

        watched_transactions::Entity::insert_many(models)
            .exec_without_returning(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(())
    }

    async fn list_transactions(&self, address: &Address) -> StorageResult<Vec<Transaction>> {
        let rows = watched_transactions::Entity::find()
            .filter(watched_transactions::Column::Address.eq(address.as_str()))
            .order_by_asc(watched_transactions::Column::Id)
            .all(self.connection())
            .await
            .map_err(StorageError::from_source)?;

        if rows.is_empty() {
            return Err(StorageError::NotFound(address.clone()));
        }

        Ok(rows.into_iter().map(row_to_transaction).collect())
    }
}

fn row_to_transaction(model: watched_transactions::Model) -> Transaction {
    Transaction {
        hash: model.tx_hash,
        from: Address::new(model.from_address),
        to: model.to_address.map(Address::new),
        timestamp: model.block_timestamp,
    }
}
