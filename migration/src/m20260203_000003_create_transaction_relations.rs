//! Migration to create the transaction_relations table
//!
//! The unique (source_tx_id, target_tx_id) index is what makes the tracer's
//! edge writes idempotent (insert with ON CONFLICT DO NOTHING).

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TransactionRelations::Table)
                    .if_not_exists()
                    .col(pk_auto(TransactionRelations::Id))
                    .col(string(TransactionRelations::CaseId).not_null())
                    .col(string(TransactionRelations::SourceTxId).not_null())
                    .col(string(TransactionRelations::TargetTxId).not_null())
                    .col(string(TransactionRelations::RelationType).not_null())
                    .col(double(TransactionRelations::Confidence).not_null())
                    .col(string(TransactionRelations::MatchReason).not_null())
                    .col(integer(TransactionRelations::Distance).not_null())
                    .col(
                        timestamp(TransactionRelations::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transaction_relations_source_target")
                    .table(TransactionRelations::Table)
                    .col(TransactionRelations::SourceTxId)
                    .col(TransactionRelations::TargetTxId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index for relation lookups per case (visualization consumers)
        manager
            .create_index(
                Index::create()
                    .name("idx_transaction_relations_case")
                    .table(TransactionRelations::Table)
                    .col(TransactionRelations::CaseId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TransactionRelations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TransactionRelations {
    Table,
    Id,
    CaseId,
    SourceTxId,
    TargetTxId,
    RelationType,
    Confidence,
    MatchReason,
    Distance,
    CreatedAt,
}
