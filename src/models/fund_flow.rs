use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::transactions;
use crate::services::filters::FundFlowFilters;
use crate::services::fund_flow::{FundFlowError, amount_to_f64};

/// One hop of a traced chain. The seed node sits at depth 0 with
/// confidence 1.0; every later node carries the reason it was linked.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainNode {
    pub transaction_id: String,
    pub depth: u32,
    pub amount: f64,
    pub transaction_date: NaiveDate,
    pub memo: Option<String>,
    pub category: Option<String>,
    pub creditor_name: Option<String>,
    pub match_reason: String,
    pub confidence: f64,
}

/// An ordered traversal branch, seed first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionChain {
    pub nodes: Vec<ChainNode>,
    pub total_amount: f64,
    pub max_depth: u32,
    pub path: String,
}

/// Raw tracer output before any post-trace filtering.
#[derive(Debug)]
pub struct TracingResult {
    pub chains: Vec<TransactionChain>,
    pub total_transactions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainType {
    #[serde(rename = "UPSTREAM")]
    Upstream,
    #[serde(rename = "DOWNSTREAM")]
    Downstream,
}

impl ChainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainType::Upstream => "UPSTREAM",
            ChainType::Downstream => "DOWNSTREAM",
        }
    }
}

fn default_max_depth() -> u32 {
    3
}

fn default_amount_tolerance() -> f64 {
    0.1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRequest {
    pub transaction_id: String,
    pub case_id: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance: f64,
    #[serde(default)]
    pub filters: Option<FundFlowFilters>,
}

impl TraceRequest {
    pub fn validate(&self) -> Result<(), String> {
        if Uuid::parse_str(&self.transaction_id).is_err() {
            return Err(format!(
                "transaction id '{}' is not a valid UUID",
                self.transaction_id
            ));
        }
        if Uuid::parse_str(&self.case_id).is_err() {
            return Err(format!("case id '{}' is not a valid UUID", self.case_id));
        }
        if !(1..=5).contains(&self.max_depth) {
            return Err(format!(
                "max depth must be between 1 and 5, got {}",
                self.max_depth
            ));
        }
        if !(self.amount_tolerance > 0.0 && self.amount_tolerance <= 1.0) {
            return Err(format!(
                "amount tolerance must be in (0, 1], got {}",
                self.amount_tolerance
            ));
        }
        Ok(())
    }
}

/// The resolved seed, echoed back with amounts normalized to f64.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedTransaction {
    pub id: String,
    pub case_id: String,
    pub transaction_date: NaiveDate,
    pub deposit_amount: Option<f64>,
    pub withdrawal_amount: Option<f64>,
    pub memo: Option<String>,
    pub category: Option<String>,
    pub creditor_name: Option<String>,
}

impl SeedTransaction {
    pub fn from_model(tx: &transactions::Model) -> Result<Self, FundFlowError> {
        Ok(Self {
            id: tx.id.clone(),
            case_id: tx.case_id.clone(),
            transaction_date: tx.transaction_date,
            deposit_amount: tx.deposit_amount.map(amount_to_f64).transpose()?,
            withdrawal_amount: tx.withdrawal_amount.map(amount_to_f64).transpose()?,
            memo: tx.memo.clone(),
            category: tx.category.clone(),
            creditor_name: tx.creditor_name.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResponse {
    pub start_transaction: SeedTransaction,
    pub chains: Vec<TransactionChain>,
    pub total_chains: usize,
    pub total_transactions: u32,
    pub response_time_ms: u64,
    pub max_depth: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveChainRequest {
    pub case_id: String,
    pub start_tx_id: String,
    pub end_tx_id: String,
    pub chain_type: ChainType,
    pub chain_depth: u32,
    pub path: String,
    pub total_amount: Option<f64>,
}

impl SaveChainRequest {
    pub fn validate(&self) -> Result<(), String> {
        for (label, id) in [
            ("case id", &self.case_id),
            ("start transaction id", &self.start_tx_id),
            ("end transaction id", &self.end_tx_id),
        ] {
            if Uuid::parse_str(id).is_err() {
                return Err(format!("{label} '{id}' is not a valid UUID"));
            }
        }
        if !(1..=5).contains(&self.chain_depth) {
            return Err(format!(
                "chain depth must be between 1 and 5, got {}",
                self.chain_depth
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveChainResponse {
    pub success: bool,
    pub chain_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedChainsQuery {
    pub case_id: String,
    pub chain_type: Option<ChainType>,
}

/// Start/end transaction details attached to a saved chain for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub transaction_date: NaiveDate,
    pub deposit_amount: Option<f64>,
    pub withdrawal_amount: Option<f64>,
    pub memo: Option<String>,
}

impl TransactionSummary {
    pub fn from_model(tx: &transactions::Model) -> Result<Self, FundFlowError> {
        Ok(Self {
            transaction_date: tx.transaction_date,
            deposit_amount: tx.deposit_amount.map(amount_to_f64).transpose()?,
            withdrawal_amount: tx.withdrawal_amount.map(amount_to_f64).transpose()?,
            memo: tx.memo.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedChain {
    pub id: i32,
    pub case_id: String,
    pub start_tx_id: String,
    pub end_tx_id: String,
    pub chain_type: String,
    pub chain_depth: i32,
    pub path: String,
    pub total_amount: Option<f64>,
    pub start_tx: Option<TransactionSummary>,
    pub end_tx: Option<TransactionSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedChainsResponse {
    pub chains: Vec<SavedChain>,
    pub total_chains: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFilterRequest {
    pub user_id: String,
    pub name: String,
    pub filters: FundFlowFilters,
}

impl SaveFilterRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() || self.name.len() > 100 {
            return Err(format!(
                "filter name must be 1-100 characters, got {}",
                self.name.len()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFilterResponse {
    pub success: bool,
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFiltersQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFilterItem {
    pub id: i32,
    pub name: String,
    pub filters: FundFlowFilters,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFiltersResponse {
    pub filters: Vec<SavedFilterItem>,
    pub total_filters: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFilterResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
