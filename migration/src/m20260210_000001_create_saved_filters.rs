//! Migration to create the saved_filters table

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SavedFilters::Table)
                    .if_not_exists()
                    .col(pk_auto(SavedFilters::Id))
                    .col(string(SavedFilters::UserId).not_null())
                    .col(string(SavedFilters::Name).not_null())
                    .col(json(SavedFilters::Filters).not_null())
                    .col(timestamp(SavedFilters::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp(SavedFilters::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        // One filter per (user, name); saving again overwrites
        manager
            .create_index(
                Index::create()
                    .name("idx_saved_filters_user_name")
                    .table(SavedFilters::Table)
                    .col(SavedFilters::UserId)
                    .col(SavedFilters::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SavedFilters::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SavedFilters {
    Table,
    Id,
    UserId,
    Name,
    Filters,
    CreatedAt,
    UpdatedAt,
}
