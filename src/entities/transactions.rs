//! SeaORM Entity for the transactions table
//!
//! Bank transactions ingested per insolvency case. Read-only for the fund
//! flow engine: exactly one of deposit_amount / withdrawal_amount is set
//! per row by domain convention.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub case_id: String,
    pub transaction_date: Date,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))", nullable)]
    pub deposit_amount: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))", nullable)]
    pub withdrawal_amount: Option<Decimal>,
    pub memo: Option<String>,
    pub category: Option<String>,
    pub creditor_name: Option<String>,
    pub transaction_nature: Option<String>,
    pub important_transaction: Option<bool>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
