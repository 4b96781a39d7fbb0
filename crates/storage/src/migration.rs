use ledger_watch_domain::storage::{StorageError, StorageResult};
use sea_orm::sea_query::{ColumnDef, Expr, Index, Table, TableCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection};

use crate::entity::watched_transactions;

const ADDRESS_INDEX: &str = "idx_watched_transactions_address";

pub async fn run_migrations(db: &DatabaseConnection) -> StorageResult<()> {
    let backend = db.get_database_backend();

    let transactions_table = Table::create()
        .table(watched_transactions::Entity)
        .col(
            ColumnDef::new(watched_transactions::Column::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(watched_transactions::Column::Address)
                .string_len(42)
                .not_null(),
        )
        .col(
            ColumnDef::new(watched_transactions::Column::TxHash)
                .string_len(66)
                .not_null(),
        )
        .col(
            ColumnDef::new(watched_transactions::Column::FromAddress)
                .string_len(42)
                .not_null(),
        )
        .col(
            ColumnDef::new(watched_transactions::Column::ToAddress)
                .string_len(42)
                .null(),
        )
        .col(
            ColumnDef::new(watched_transactions::Column::BlockTimestamp)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(watched_transactions::Column::RecordedAt)
                .date_time()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .to_owned();
    create_table(db, backend, transactions_table).await?;

    let address_index = Index::create()
        .if_not_exists()
        .name(ADDRESS_INDEX)
        .table(watched_transactions::Entity)
        .col(watched_transactions::Column::Address)
        .to_owned();
    db.execute(backend.build(&address_index))
        .await
        .map_err(StorageError::from_source)?;

    Ok(())
}

async fn create_table(
    db: &DatabaseConnection,
    backend: DatabaseBackend,
    mut statement: TableCreateStatement,
) -> StorageResult<()> {
    statement.if_not_exists();
    db.execute(backend.build(&statement))
        .await
        .map_err(StorageError::from_source)?;
    Ok(())
}
