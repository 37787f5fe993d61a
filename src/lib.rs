// src/lib.rs

use std::sync::Arc;

use sea_orm::DatabaseConnection;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
}

pub mod entities {
    pub mod prelude;
    pub mod saved_filters;
    pub mod tags;
    pub mod transaction_chains;
    pub mod transaction_relations;
    pub mod transaction_tags;
    pub mod transactions;
}

pub mod services {
    pub mod filters;
    pub mod fund_flow;
}

pub mod models;
pub mod handlers;
