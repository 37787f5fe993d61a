//! Migration to create the transaction_chains table

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TransactionChains::Table)
                    .if_not_exists()
                    .col(pk_auto(TransactionChains::Id))
                    .col(string(TransactionChains::CaseId).not_null())
                    .col(string(TransactionChains::StartTxId).not_null())
                    .col(string(TransactionChains::EndTxId).not_null())
                    .col(string(TransactionChains::ChainType).not_null())
                    .col(integer(TransactionChains::ChainDepth).not_null())
                    .col(text(TransactionChains::Path).not_null())
                    .col(decimal_len_null(TransactionChains::TotalAmount, 20, 4))
                    .col(
                        timestamp(TransactionChains::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Listing filters on case_id and orders by chain_depth
        manager
            .create_index(
                Index::create()
                    .name("idx_transaction_chains_case_depth")
                    .table(TransactionChains::Table)
                    .col(TransactionChains::CaseId)
                    .col(TransactionChains::ChainDepth)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TransactionChains::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TransactionChains {
    Table,
    Id,
    CaseId,
    StartTxId,
    EndTxId,
    ChainType,
    ChainDepth,
    Path,
    TotalAmount,
    CreatedAt,
}
