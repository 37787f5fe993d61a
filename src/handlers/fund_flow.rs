use std::collections::{HashMap, HashSet};
use std::time::Instant;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ModelTrait, Order, QueryFilter,
    QueryOrder,
};

use crate::AppState;
use crate::entities::{prelude::*, saved_filters, transaction_chains, transactions};
use crate::models::fund_flow::{
    DeleteFilterResponse, ErrorResponse, SaveChainRequest, SaveChainResponse, SaveFilterRequest,
    SaveFilterResponse, SavedChain, SavedChainsQuery, SavedChainsResponse, SavedFilterItem,
    SavedFiltersQuery, SavedFiltersResponse, SeedTransaction, TraceRequest, TraceResponse,
    TransactionSummary,
};
use crate::services::filters::{FundFlowFilters, apply_chain_filters};
use crate::services::fund_flow::{
    FundFlowError, TraceDirection, amount_to_f64, trace_downstream_funds, trace_upstream_funds,
};

/// Operational SLO per trace call; overruns are logged, never aborted.
const TRACE_BUDGET_MS: u128 = 3000;

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: FundFlowError) -> HandlerError {
    let status = match &err {
        FundFlowError::NotFound(_) => StatusCode::NOT_FOUND,
        FundFlowError::ScopeMismatch { .. }
        | FundFlowError::InvalidDirection(_)
        | FundFlowError::RangeValidation(_) => StatusCode::BAD_REQUEST,
        FundFlowError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: err.to_string() }))
}

fn bad_request(message: String) -> HandlerError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
}

fn db_error(err: sea_orm::DbErr) -> HandlerError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("Database error: {err}"),
        }),
    )
}

/// Handler for POST /api/fund-flow/trace-upstream
pub async fn trace_upstream(
    State(state): State<AppState>,
    Json(request): Json<TraceRequest>,
) -> Result<Json<TraceResponse>, HandlerError> {
    handle_trace(state, request, TraceDirection::Upstream).await
}

/// Handler for POST /api/fund-flow/trace-downstream
pub async fn trace_downstream(
    State(state): State<AppState>,
    Json(request): Json<TraceRequest>,
) -> Result<Json<TraceResponse>, HandlerError> {
    handle_trace(state, request, TraceDirection::Downstream).await
}

async fn handle_trace(
    state: AppState,
    request: TraceRequest,
    direction: TraceDirection,
) -> Result<Json<TraceResponse>, HandlerError> {
    request.validate().map_err(bad_request)?;

    let seed = Transactions::find_by_id(request.transaction_id.clone())
        .one(&*state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| error_response(FundFlowError::NotFound(request.transaction_id.clone())))?;

    if seed.case_id != request.case_id {
        return Err(error_response(FundFlowError::ScopeMismatch {
            tx_id: seed.id,
            case_id: request.case_id,
        }));
    }

    // Normalize the echo first so decimal conversion problems surface
    // before any traversal work happens
    let start_transaction = SeedTransaction::from_model(&seed).map_err(error_response)?;

    let started = Instant::now();
    let result = match direction {
        TraceDirection::Upstream => {
            trace_upstream_funds(&*state.db, &seed, request.max_depth, request.amount_tolerance)
                .await
        }
        TraceDirection::Downstream => {
            trace_downstream_funds(&*state.db, &seed, request.max_depth, request.amount_tolerance)
                .await
        }
    }
    .map_err(error_response)?;
    let elapsed = started.elapsed();

    if elapsed.as_millis() > TRACE_BUDGET_MS {
        tracing::warn!(
            "[FundFlow] {} trace exceeded {}ms budget: {}ms",
            direction.as_str(),
            TRACE_BUDGET_MS,
            elapsed.as_millis()
        );
    }

    let chains = match &request.filters {
        Some(filters) => apply_chain_filters(&*state.db, result.chains, filters)
            .await
            .map_err(db_error)?,
        None => result.chains,
    };

    let total_transactions: u32 = chains.iter().map(|chain| chain.max_depth).sum();

    Ok(Json(TraceResponse {
        start_transaction,
        total_chains: chains.len(),
        total_transactions,
        chains,
        response_time_ms: elapsed.as_millis() as u64,
        max_depth: request.max_depth,
    }))
}

/// Handler for POST /api/fund-flow/chains
///
/// Pure create: saving the same chain twice yields two rows. Chains are
/// user-curated snapshots, not a cache.
pub async fn save_chain(
    State(state): State<AppState>,
    Json(request): Json<SaveChainRequest>,
) -> Result<Json<SaveChainResponse>, HandlerError> {
    request.validate().map_err(bad_request)?;

    let total_amount = match request.total_amount {
        Some(value) => Some(Decimal::from_f64(value).ok_or_else(|| {
            bad_request(format!("total amount {value} cannot be stored as a decimal"))
        })?),
        None => None,
    };

    let chain = transaction_chains::ActiveModel {
        case_id: Set(request.case_id),
        start_tx_id: Set(request.start_tx_id),
        end_tx_id: Set(request.end_tx_id),
        chain_type: Set(request.chain_type.as_str().to_string()),
        chain_depth: Set(request.chain_depth as i32),
        path: Set(request.path),
        total_amount: Set(total_amount),
        ..Default::default()
    }
    .insert(&*state.db)
    .await
    .map_err(db_error)?;

    Ok(Json(SaveChainResponse {
        success: true,
        chain_id: chain.id,
    }))
}

/// Handler for GET /api/fund-flow/chains
///
/// Lists saved chains for a case, deepest first, each expanded with its
/// start/end transaction summaries. Amounts are echoed as stored; nothing
/// is recomputed here.
pub async fn get_saved_chains(
    State(state): State<AppState>,
    Query(query): Query<SavedChainsQuery>,
) -> Result<Json<SavedChainsResponse>, HandlerError> {
    let mut finder =
        TransactionChains::find().filter(transaction_chains::Column::CaseId.eq(&query.case_id));
    if let Some(chain_type) = query.chain_type {
        finder = finder.filter(transaction_chains::Column::ChainType.eq(chain_type.as_str()));
    }
    let rows = finder
        .order_by(transaction_chains::Column::ChainDepth, Order::Desc)
        .all(&*state.db)
        .await
        .map_err(db_error)?;

    // One batched lookup covers every start/end transaction
    let tx_ids: HashSet<String> = rows
        .iter()
        .flat_map(|row| [row.start_tx_id.clone(), row.end_tx_id.clone()])
        .collect();

    let mut summaries: HashMap<String, TransactionSummary> = HashMap::new();
    if !tx_ids.is_empty() {
        let transactions = Transactions::find()
            .filter(transactions::Column::Id.is_in(tx_ids))
            .all(&*state.db)
            .await
            .map_err(db_error)?;
        for tx in transactions {
            let summary = TransactionSummary::from_model(&tx).map_err(error_response)?;
            summaries.insert(tx.id, summary);
        }
    }

    let mut chains = Vec::with_capacity(rows.len());
    for row in rows {
        let total_amount = row
            .total_amount
            .map(amount_to_f64)
            .transpose()
            .map_err(error_response)?;
        chains.push(SavedChain {
            id: row.id,
            case_id: row.case_id,
            start_tx: summaries.get(&row.start_tx_id).cloned(),
            end_tx: summaries.get(&row.end_tx_id).cloned(),
            start_tx_id: row.start_tx_id,
            end_tx_id: row.end_tx_id,
            chain_type: row.chain_type,
            chain_depth: row.chain_depth,
            path: row.path,
            total_amount,
        });
    }

    Ok(Json(SavedChainsResponse {
        total_chains: chains.len(),
        chains,
    }))
}

/// Handler for POST /api/fund-flow/filters
///
/// Upsert by (user_id, name): saving under an existing name overwrites
/// that filter's payload.
pub async fn save_filter(
    State(state): State<AppState>,
    Json(request): Json<SaveFilterRequest>,
) -> Result<Json<SaveFilterResponse>, HandlerError> {
    request.validate().map_err(bad_request)?;

    let payload = serde_json::to_value(&request.filters)
        .map_err(|err| bad_request(format!("invalid filter payload: {err}")))?;

    let existing = SavedFilters::find()
        .filter(saved_filters::Column::UserId.eq(&request.user_id))
        .filter(saved_filters::Column::Name.eq(&request.name))
        .one(&*state.db)
        .await
        .map_err(db_error)?;

    let saved = match existing {
        Some(record) => {
            let mut active: saved_filters::ActiveModel = record.into();
            active.filters = Set(payload);
            active.updated_at = Set(Utc::now().naive_utc());
            active.update(&*state.db).await.map_err(db_error)?
        }
        None => saved_filters::ActiveModel {
            user_id: Set(request.user_id.clone()),
            name: Set(request.name.clone()),
            filters: Set(payload),
            ..Default::default()
        }
        .insert(&*state.db)
        .await
        .map_err(db_error)?,
    };

    Ok(Json(SaveFilterResponse {
        success: true,
        id: saved.id,
        name: saved.name,
    }))
}

/// Handler for GET /api/fund-flow/filters
pub async fn get_saved_filters(
    State(state): State<AppState>,
    Query(query): Query<SavedFiltersQuery>,
) -> Result<Json<SavedFiltersResponse>, HandlerError> {
    let rows = SavedFilters::find()
        .filter(saved_filters::Column::UserId.eq(&query.user_id))
        .order_by(saved_filters::Column::CreatedAt, Order::Desc)
        .all(&*state.db)
        .await
        .map_err(db_error)?;

    let filters: Vec<SavedFilterItem> = rows
        .into_iter()
        .map(|row| {
            let parsed: FundFlowFilters =
                serde_json::from_value(row.filters).unwrap_or_else(|err| {
                    tracing::warn!("[FundFlow] stored filter {} is unreadable: {err}", row.id);
                    FundFlowFilters::default()
                });
            SavedFilterItem {
                id: row.id,
                name: row.name,
                filters: parsed,
                created_at: row.created_at,
            }
        })
        .collect();

    Ok(Json(SavedFiltersResponse {
        total_filters: filters.len(),
        filters,
    }))
}

/// Handler for DELETE /api/fund-flow/filters/{id}
pub async fn delete_saved_filter(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<SavedFiltersQuery>,
) -> Result<Json<DeleteFilterResponse>, HandlerError> {
    let filter = SavedFilters::find_by_id(id)
        .one(&*state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("filter {id} not found"),
                }),
            )
        })?;

    if filter.user_id != query.user_id {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "filter belongs to another user".to_string(),
            }),
        ));
    }

    filter.delete(&*state.db).await.map_err(db_error)?;

    Ok(Json(DeleteFilterResponse { success: true }))
}
