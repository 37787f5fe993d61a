//! SeaORM Entity for the transaction_chains table
//!
//! User-curated snapshots of traced chains, saved on demand so they can be
//! listed later without re-tracing. Duplicate saves are allowed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_chains")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub case_id: String,
    pub start_tx_id: String,
    pub end_tx_id: String,
    pub chain_type: String,
    pub chain_depth: i32,
    pub path: String,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))", nullable)]
    pub total_amount: Option<Decimal>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
