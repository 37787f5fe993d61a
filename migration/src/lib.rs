pub use sea_orm_migration::prelude::*;

mod m20260203_000001_create_transactions;
mod m20260203_000002_create_tags;
mod m20260203_000003_create_transaction_relations;
mod m20260203_000004_create_transaction_chains;
mod m20260210_000001_create_saved_filters;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260203_000001_create_transactions::Migration),
            Box::new(m20260203_000002_create_tags::Migration),
            Box::new(m20260203_000003_create_transaction_relations::Migration),
            Box::new(m20260203_000004_create_transaction_chains::Migration),
            Box::new(m20260210_000001_create_saved_filters::Migration),
        ]
    }
}
