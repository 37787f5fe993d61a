//! Migration to create the transactions table
//!
//! Candidate search filters on (case_id, amount, date), so both amount
//! columns get a composite index with case_id.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(string(Transactions::Id).primary_key())
                    .col(string(Transactions::CaseId).not_null())
                    .col(date(Transactions::TransactionDate).not_null())
                    .col(decimal_len_null(Transactions::DepositAmount, 20, 4))
                    .col(decimal_len_null(Transactions::WithdrawalAmount, 20, 4))
                    .col(string_null(Transactions::Memo))
                    .col(string_null(Transactions::Category))
                    .col(string_null(Transactions::CreditorName))
                    .col(string_null(Transactions::TransactionNature))
                    .col(boolean_null(Transactions::ImportantTransaction))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_case_date")
                    .table(Transactions::Table)
                    .col(Transactions::CaseId)
                    .col(Transactions::TransactionDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_case_deposit")
                    .table(Transactions::Table)
                    .col(Transactions::CaseId)
                    .col(Transactions::DepositAmount)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_case_withdrawal")
                    .table(Transactions::Table)
                    .col(Transactions::CaseId)
                    .col(Transactions::WithdrawalAmount)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    CaseId,
    TransactionDate,
    DepositAmount,
    WithdrawalAmount,
    Memo,
    Category,
    CreditorName,
    TransactionNature,
    ImportantTransaction,
}
