//! SeaORM Entity for the transaction_relations table
//!
//! Probable-transfer edges discovered by tracing. Unique on
//! (source_tx_id, target_tx_id); discovery of an existing edge is a no-op.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_relations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub case_id: String,
    pub source_tx_id: String,
    pub target_tx_id: String,
    pub relation_type: String,
    pub confidence: f64,
    pub match_reason: String,
    pub distance: i32,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
