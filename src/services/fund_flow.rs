//! Fund flow tracing service
//!
//! Answers "where did this money probably come from / go?" for one seed
//! transaction by breadth-first search over approximate amount/date matches:
//! upstream walks deposit -> withdrawal -> deposit backwards in time,
//! downstream walks withdrawal -> deposit -> withdrawal forwards.
//!
//! Traversal is bounded three ways: a global visited set (one use of a
//! transaction per trace call), a per-node candidate cap of 10, and a depth
//! limit of at most 5. Discovered edges are cached as transaction_relations
//! rows; those writes are best-effort and never fail the trace.

use std::collections::{HashSet, VecDeque};

use chrono::NaiveDate;
use futures_util::future::join_all;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QuerySelect,
};
use thiserror::Error;

use crate::entities::{prelude::*, transaction_relations, transactions};
use crate::models::fund_flow::{ChainNode, TracingResult, TransactionChain};

pub const PROBABLE_TRANSFER: &str = "PROBABLE_TRANSFER";

/// Branching-factor bound per expanded node. Trades completeness for latency.
const CANDIDATE_LIMIT: u64 = 10;

const AMOUNT_WEIGHT: f64 = 0.7;
const DATE_WEIGHT: f64 = 0.3;
const DATE_HORIZON_DAYS: f64 = 30.0;

#[derive(Debug, Error)]
pub enum FundFlowError {
    #[error("transaction {0} not found")]
    NotFound(String),
    #[error("transaction {tx_id} does not belong to case {case_id}")]
    ScopeMismatch { tx_id: String, case_id: String },
    #[error("{0}")]
    InvalidDirection(String),
    #[error("{0}")]
    RangeValidation(String),
    #[error("persistence failure: {0}")]
    Persistence(#[from] DbErr),
}

/// The one amount a transaction carries: money in or money out.
///
/// Exactly one of deposit_amount / withdrawal_amount is set per row by
/// domain convention; classifying up front keeps the convention violations
/// out of the traversal logic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowAmount {
    Inflow(Decimal),
    Outflow(Decimal),
}

impl FlowAmount {
    pub fn classify(tx: &transactions::Model) -> Result<Self, FundFlowError> {
        match (tx.deposit_amount, tx.withdrawal_amount) {
            (Some(deposit), None) => Ok(FlowAmount::Inflow(deposit)),
            (None, Some(withdrawal)) => Ok(FlowAmount::Outflow(withdrawal)),
            (Some(_), Some(_)) => Err(FundFlowError::RangeValidation(format!(
                "transaction {} has both deposit and withdrawal amounts set",
                tx.id
            ))),
            (None, None) => Err(FundFlowError::RangeValidation(format!(
                "transaction {} has no amount",
                tx.id
            ))),
        }
    }

    pub fn value(&self) -> Decimal {
        match self {
            FlowAmount::Inflow(amount) | FlowAmount::Outflow(amount) => *amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceDirection {
    Upstream,
    Downstream,
}

impl TraceDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceDirection::Upstream => "upstream",
            TraceDirection::Downstream => "downstream",
        }
    }
}

/// Converts a stored decimal amount to f64, rejecting values that do not
/// map to a finite float instead of letting NaN leak into comparisons.
pub fn amount_to_f64(amount: Decimal) -> Result<f64, FundFlowError> {
    match amount.to_f64() {
        Some(value) if value.is_finite() => Ok(value),
        _ => Err(FundFlowError::RangeValidation(format!(
            "amount {amount} cannot be represented as a finite number"
        ))),
    }
}

/// True iff `target` falls within `source` ± tolerance (a fraction, e.g.
/// 0.1 for ±10%). Bounds are inclusive.
pub fn is_amount_match(source: f64, target: f64, tolerance: f64) -> bool {
    let lower = source * (1.0 - tolerance);
    let upper = source * (1.0 + tolerance);
    target >= lower && target <= upper
}

/// Link confidence: 70% amount agreement, 30% date proximity (full score
/// same-day, fading to zero at 30 days). Both inputs are non-negative, so
/// the max() terms keep the result in [0, 1].
pub fn calculate_confidence(amount_diff_ratio: f64, date_diff_days: f64) -> f64 {
    let amount_score = (1.0 - amount_diff_ratio).max(0.0);
    let date_score = (1.0 - date_diff_days / DATE_HORIZON_DAYS).max(0.0);
    amount_score * AMOUNT_WEIGHT + date_score * DATE_WEIGHT
}

struct QueueEntry {
    transaction_id: String,
    depth: u32,
    path: Vec<ChainNode>,
    total_amount: f64,
}

/// Traces the probable sources of a deposit backwards in time.
pub async fn trace_upstream_funds(
    db: &DatabaseConnection,
    seed: &transactions::Model,
    max_depth: u32,
    amount_tolerance: f64,
) -> Result<TracingResult, FundFlowError> {
    match FlowAmount::classify(seed)? {
        FlowAmount::Inflow(_) => {
            run_trace(db, seed, TraceDirection::Upstream, max_depth, amount_tolerance).await
        }
        FlowAmount::Outflow(_) => Err(FundFlowError::InvalidDirection(format!(
            "transaction {} is not a deposit, cannot trace upstream",
            seed.id
        ))),
    }
}

/// Traces the probable destinations of a withdrawal forwards in time.
pub async fn trace_downstream_funds(
    db: &DatabaseConnection,
    seed: &transactions::Model,
    max_depth: u32,
    amount_tolerance: f64,
) -> Result<TracingResult, FundFlowError> {
    match FlowAmount::classify(seed)? {
        FlowAmount::Outflow(_) => {
            run_trace(db, seed, TraceDirection::Downstream, max_depth, amount_tolerance).await
        }
        FlowAmount::Inflow(_) => Err(FundFlowError::InvalidDirection(format!(
            "transaction {} is not a withdrawal, cannot trace downstream",
            seed.id
        ))),
    }
}

async fn run_trace(
    db: &DatabaseConnection,
    seed: &transactions::Model,
    direction: TraceDirection,
    max_depth: u32,
    amount_tolerance: f64,
) -> Result<TracingResult, FundFlowError> {
    tracing::info!(
        "[FundFlow] {} trace started - tx: {}, max_depth: {}",
        direction.as_str(),
        seed.id,
        max_depth
    );

    let seed_value = amount_to_f64(FlowAmount::classify(seed)?.value())?;
    let tolerance = Decimal::from_f64(amount_tolerance).ok_or_else(|| {
        FundFlowError::RangeValidation(format!("invalid amount tolerance {amount_tolerance}"))
    })?;

    let mut chains: Vec<TransactionChain> = Vec::new();
    // Cycle guard, global to the whole trace call: once any branch consumes
    // a transaction, no sibling branch may reuse it.
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(seed.id.clone());

    let seed_node = ChainNode {
        transaction_id: seed.id.clone(),
        depth: 0,
        amount: seed_value,
        transaction_date: seed.transaction_date,
        memo: seed.memo.clone(),
        category: seed.category.clone(),
        creditor_name: seed.creditor_name.clone(),
        match_reason: "seed transaction".to_string(),
        confidence: 1.0,
    };

    let mut queue: VecDeque<QueueEntry> = VecDeque::new();
    queue.push_back(QueueEntry {
        transaction_id: seed.id.clone(),
        depth: 0,
        path: vec![seed_node],
        total_amount: seed_value,
    });

    while let Some(current) = queue.pop_front() {
        // A path that reached the depth limit becomes a chain. Branches that
        // dry out earlier never get here and are dropped without emitting.
        if current.depth >= max_depth {
            chains.push(TransactionChain {
                path: current
                    .path
                    .iter()
                    .map(|node| node.transaction_id.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                total_amount: current.total_amount,
                max_depth: current.depth,
                nodes: current.path,
            });
            continue;
        }

        let Some(current_tx) = Transactions::find_by_id(current.transaction_id.clone())
            .one(db)
            .await?
        else {
            continue;
        };

        let current_amount = match FlowAmount::classify(&current_tx) {
            Ok(flow) => flow.value(),
            Err(err) => {
                tracing::warn!("[FundFlow] skipping malformed transaction: {err}");
                continue;
            }
        };
        let current_value = amount_to_f64(current_amount)?;

        let candidates = find_candidates(
            db,
            &seed.case_id,
            current_amount,
            tolerance,
            current_tx.transaction_date,
            direction,
            &visited,
        )
        .await?;

        let mut upserts = Vec::new();

        for candidate in candidates {
            let candidate_amount = match FlowAmount::classify(&candidate) {
                Ok(flow) => flow.value(),
                Err(err) => {
                    tracing::warn!("[FundFlow] skipping malformed candidate: {err}");
                    continue;
                }
            };
            let candidate_value = amount_to_f64(candidate_amount)?;

            // The store already filtered on the amount range; re-check so
            // acceptance never depends on the store alone.
            if !is_amount_match(current_value, candidate_value, amount_tolerance) {
                continue;
            }

            let amount_diff = (current_value - candidate_value).abs() / current_value;
            let date_diff_days = (current_tx.transaction_date - candidate.transaction_date)
                .num_days()
                .abs();
            let confidence = calculate_confidence(amount_diff, date_diff_days as f64);
            let match_pct = ((1.0 - amount_diff) * 100.0).round() as i64;
            let when = match direction {
                TraceDirection::Upstream => "earlier",
                TraceDirection::Downstream => "later",
            };
            let match_reason = format!(
                "amount {candidate_value:.2} ({match_pct}% match), {date_diff_days} days {when}"
            );

            if !visited.insert(candidate.id.clone()) {
                continue;
            }

            let node = ChainNode {
                transaction_id: candidate.id.clone(),
                depth: current.depth + 1,
                amount: candidate_value,
                transaction_date: candidate.transaction_date,
                memo: candidate.memo.clone(),
                category: candidate.category.clone(),
                creditor_name: candidate.creditor_name.clone(),
                match_reason: match_reason.clone(),
                confidence,
            };

            let mut path = current.path.clone();
            path.push(node);
            queue.push_back(QueueEntry {
                transaction_id: candidate.id.clone(),
                depth: current.depth + 1,
                path,
                total_amount: current.total_amount + candidate_value,
            });

            // Upstream edges point candidate -> current (money flowed from
            // the earlier withdrawal into the deposit we came from);
            // downstream edges point current -> candidate.
            let (source_tx_id, target_tx_id) = match direction {
                TraceDirection::Upstream => {
                    (candidate.id.clone(), current.transaction_id.clone())
                }
                TraceDirection::Downstream => {
                    (current.transaction_id.clone(), candidate.id.clone())
                }
            };
            upserts.push(upsert_relation(
                db,
                seed.case_id.clone(),
                source_tx_id,
                target_tx_id,
                confidence,
                match_reason,
                current.depth + 1,
            ));
        }

        // All edge writes for this node run together and are awaited before
        // the next node is dequeued. The relation cache is best-effort, so a
        // failed write is logged and the traversal continues.
        for result in join_all(upserts).await {
            if let Err(err) = result {
                tracing::warn!("[FundFlow] relation upsert failed: {err}");
            }
        }
    }

    tracing::info!(
        "[FundFlow] {} trace finished - {} chains, {} transactions visited",
        direction.as_str(),
        chains.len(),
        visited.len()
    );

    Ok(TracingResult {
        total_transactions: visited.len(),
        chains,
    })
}

async fn find_candidates(
    db: &DatabaseConnection,
    case_id: &str,
    current_amount: Decimal,
    tolerance: Decimal,
    current_date: NaiveDate,
    direction: TraceDirection,
    visited: &HashSet<String>,
) -> Result<Vec<transactions::Model>, DbErr> {
    let lower = current_amount * (Decimal::ONE - tolerance);
    let upper = current_amount * (Decimal::ONE + tolerance);

    let query = Transactions::find()
        .filter(transactions::Column::CaseId.eq(case_id))
        .filter(transactions::Column::Id.is_not_in(visited.iter().cloned()));

    let query = match direction {
        // Upstream: withdrawals strictly before the current transaction
        TraceDirection::Upstream => query
            .filter(transactions::Column::WithdrawalAmount.gte(lower))
            .filter(transactions::Column::WithdrawalAmount.lte(upper))
            .filter(transactions::Column::TransactionDate.lt(current_date)),
        // Downstream: deposits strictly after it
        TraceDirection::Downstream => query
            .filter(transactions::Column::DepositAmount.gte(lower))
            .filter(transactions::Column::DepositAmount.lte(upper))
            .filter(transactions::Column::TransactionDate.gt(current_date)),
    };

    query.limit(CANDIDATE_LIMIT).all(db).await
}

/// Records a discovered edge. Keyed unique on (source, target); rediscovery
/// is a DO NOTHING no-op, which is what makes concurrent traces over the
/// same case safe to race.
async fn upsert_relation(
    db: &DatabaseConnection,
    case_id: String,
    source_tx_id: String,
    target_tx_id: String,
    confidence: f64,
    match_reason: String,
    distance: u32,
) -> Result<(), DbErr> {
    let relation = transaction_relations::ActiveModel {
        case_id: Set(case_id),
        source_tx_id: Set(source_tx_id),
        target_tx_id: Set(target_tx_id),
        relation_type: Set(PROBABLE_TRANSFER.to_string()),
        confidence: Set(confidence),
        match_reason: Set(match_reason),
        distance: Set(distance as i32),
        ..Default::default()
    };

    TransactionRelations::insert(relation)
        .on_conflict(
            OnConflict::columns([
                transaction_relations::Column::SourceTxId,
                transaction_relations::Column::TargetTxId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}
