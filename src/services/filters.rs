//! Post-trace chain filtering
//!
//! A traced chain documents a flow, so survival is deliberately loose: the
//! chain is kept when at least one of its nodes satisfies every supplied
//! filter dimension. Dimensions combine with AND inside a node, nodes with
//! OR across the chain.
//!
//! Date and amount dimensions evaluate against data the nodes already
//! carry. Tag, nature and importance dimensions need columns the tracer
//! does not select, so those are batch-loaded once per filter call, and
//! only when the corresponding dimension is actually present.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::entities::{prelude::*, tags, transaction_tags, transactions};
use crate::models::fund_flow::TransactionChain;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionNature {
    Creditor,
    Collateral,
    PriorityRepayment,
    General,
}

impl TransactionNature {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREDITOR" => Some(TransactionNature::Creditor),
            "COLLATERAL" => Some(TransactionNature::Collateral),
            "PRIORITY_REPAYMENT" => Some(TransactionNature::PriorityRepayment),
            "GENERAL" => Some(TransactionNature::General),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundFlowFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_range: Option<AmountRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_nature: Option<Vec<TransactionNature>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub important_only: Option<bool>,
}

impl FundFlowFilters {
    pub fn is_empty(&self) -> bool {
        self.date_range.is_none()
            && self.amount_range.is_none()
            && !self.wants_tags()
            && !self.wants_nature()
            && self.important_only != Some(true)
    }

    fn wants_tags(&self) -> bool {
        self.tags.as_ref().is_some_and(|tags| !tags.is_empty())
    }

    fn wants_nature(&self) -> bool {
        self.transaction_nature
            .as_ref()
            .is_some_and(|natures| !natures.is_empty())
    }

    fn needs_enrichment(&self) -> bool {
        self.wants_tags() || self.wants_nature() || self.important_only == Some(true)
    }
}

/// Per-transaction columns the tracer does not carry on its nodes.
#[derive(Debug, Clone, Default)]
struct TxFacts {
    tags: Vec<String>,
    nature: Option<TransactionNature>,
    important: bool,
}

fn matches_date_range(date: NaiveDate, range: &Option<DateRange>) -> bool {
    match range {
        Some(range) => date >= range.start && date <= range.end,
        None => true,
    }
}

fn matches_amount_range(amount: f64, range: &Option<AmountRange>) -> bool {
    match range {
        Some(range) => amount >= range.min && amount <= range.max,
        None => true,
    }
}

// Multiple tags are OR'd: any shared tag qualifies the node
fn matches_tags(node_tags: &[String], wanted: &Option<Vec<String>>) -> bool {
    match wanted {
        Some(wanted) if !wanted.is_empty() => {
            let wanted: HashSet<&str> = wanted.iter().map(String::as_str).collect();
            node_tags.iter().any(|tag| wanted.contains(tag.as_str()))
        }
        _ => true,
    }
}

fn matches_nature(
    nature: Option<TransactionNature>,
    wanted: &Option<Vec<TransactionNature>>,
) -> bool {
    match wanted {
        Some(wanted) if !wanted.is_empty() => {
            nature.is_some_and(|nature| wanted.contains(&nature))
        }
        _ => true,
    }
}

fn matches_important(important: bool, important_only: Option<bool>) -> bool {
    match important_only {
        Some(true) => important,
        _ => true,
    }
}

fn node_matches(
    date: NaiveDate,
    amount: f64,
    facts: &TxFacts,
    filters: &FundFlowFilters,
) -> bool {
    matches_date_range(date, &filters.date_range)
        && matches_amount_range(amount, &filters.amount_range)
        && matches_tags(&facts.tags, &filters.tags)
        && matches_nature(facts.nature, &filters.transaction_nature)
        && matches_important(facts.important, filters.important_only)
}

/// Drops chains in which no node passes the filter set.
pub async fn apply_chain_filters(
    db: &DatabaseConnection,
    chains: Vec<TransactionChain>,
    filters: &FundFlowFilters,
) -> Result<Vec<TransactionChain>, DbErr> {
    if filters.is_empty() {
        return Ok(chains);
    }

    let facts = if filters.needs_enrichment() {
        let ids: Vec<String> = chains
            .iter()
            .flat_map(|chain| chain.nodes.iter())
            .map(|node| node.transaction_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        load_tx_facts(db, ids, filters.wants_tags()).await?
    } else {
        HashMap::new()
    };

    let missing = TxFacts::default();
    let surviving = chains
        .into_iter()
        .filter(|chain| {
            chain.nodes.iter().any(|node| {
                let tx_facts = facts.get(&node.transaction_id).unwrap_or(&missing);
                node_matches(node.transaction_date, node.amount, tx_facts, filters)
            })
        })
        .collect();

    Ok(surviving)
}

async fn load_tx_facts(
    db: &DatabaseConnection,
    ids: Vec<String>,
    with_tags: bool,
) -> Result<HashMap<String, TxFacts>, DbErr> {
    let mut facts: HashMap<String, TxFacts> = HashMap::new();

    let rows = Transactions::find()
        .filter(transactions::Column::Id.is_in(ids.clone()))
        .all(db)
        .await?;
    for row in rows {
        facts.insert(
            row.id.clone(),
            TxFacts {
                tags: Vec::new(),
                nature: row
                    .transaction_nature
                    .as_deref()
                    .and_then(TransactionNature::from_str),
                important: row.important_transaction.unwrap_or(false),
            },
        );
    }

    if with_tags {
        let links = TransactionTags::find()
            .filter(transaction_tags::Column::TransactionId.is_in(ids))
            .all(db)
            .await?;
        if !links.is_empty() {
            let tag_ids: HashSet<i32> = links.iter().map(|link| link.tag_id).collect();
            let names: HashMap<i32, String> = Tags::find()
                .filter(tags::Column::Id.is_in(tag_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|tag| (tag.id, tag.name))
                .collect();
            for link in links {
                if let (Some(tx_facts), Some(name)) =
                    (facts.get_mut(&link.transaction_id), names.get(&link.tag_id))
                {
                    tx_facts.tags.push(name.clone());
                }
            }
        }
    }

    Ok(facts)
}
