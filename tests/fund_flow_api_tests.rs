//! HTTP surface tests: handlers wired into a router over a MockDatabase
//!
//! Mock results are appended per test in the order the request pipeline
//! issues its queries (seed lookup first, then the tracer's own queries).

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    routing::{delete, post},
};
use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use serde_json::{Value, json};
use tower::ServiceExt;

use fundtrace_backend::entities::{saved_filters, transaction_chains, transactions};
use fundtrace_backend::{AppState, handlers};

use crate::common::{CASE_ID, SEED_TX_ID, date, deposit, withdrawal};

const W_EXACT_ID: &str = "1d9e2f11-0000-4000-8000-0000000000b1";
const W_NEAR_ID: &str = "1d9e2f11-0000-4000-8000-0000000000b2";
const END_TX_ID: &str = "1d9e2f11-0000-4000-8000-0000000000b3";

fn build_router(db: DatabaseConnection) -> Router {
    Router::new()
        .route(
            "/api/fund-flow/trace-upstream",
            post(handlers::fund_flow::trace_upstream),
        )
        .route(
            "/api/fund-flow/trace-downstream",
            post(handlers::fund_flow::trace_downstream),
        )
        .route(
            "/api/fund-flow/chains",
            post(handlers::fund_flow::save_chain).get(handlers::fund_flow::get_saved_chains),
        )
        .route(
            "/api/fund-flow/filters",
            post(handlers::fund_flow::save_filter).get(handlers::fund_flow::get_saved_filters),
        )
        .route(
            "/api/fund-flow/filters/{id}",
            delete(handlers::fund_flow::delete_saved_filter),
        )
        .with_state(AppState { db: Arc::new(db) })
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn timestamp() -> NaiveDateTime {
    date(2026, 2, 1).and_hms_opt(12, 0, 0).unwrap()
}

fn chain_row(id: i32, depth: i32, start: &str, end: &str) -> transaction_chains::Model {
    transaction_chains::Model {
        id,
        case_id: CASE_ID.to_string(),
        start_tx_id: start.to_string(),
        end_tx_id: end.to_string(),
        chain_type: "UPSTREAM".to_string(),
        chain_depth: depth,
        path: format!("{start},{end}"),
        total_amount: Some(Decimal::from(195_000)),
        created_at: timestamp(),
    }
}

fn filter_row(id: i32, user_id: &str, name: &str) -> saved_filters::Model {
    saved_filters::Model {
        id,
        user_id: user_id.to_string(),
        name: name.to_string(),
        filters: json!({"amountRange": {"min": 0.0, "max": 100000.0}}),
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

fn trace_body(max_depth: u32) -> Value {
    json!({
        "transactionId": SEED_TX_ID,
        "caseId": CASE_ID,
        "maxDepth": max_depth,
        "amountTolerance": 0.1,
    })
}

/// Happy path: two matching withdrawals become two chains; the response
/// echoes the normalized seed and reports timing and counts.
#[tokio::test]
async fn test_trace_upstream_success() {
    let seed = deposit(SEED_TX_ID, date(2025, 6, 15), 100_000);
    let w_exact = withdrawal(W_EXACT_ID, date(2025, 6, 14), 100_000);
    let w_near = withdrawal(W_NEAR_ID, date(2025, 6, 13), 95_000);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([
            vec![seed.clone()],
            vec![seed.clone()],
            vec![w_exact, w_near],
        ])
        .append_exec_results([
            MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            },
            MockExecResult {
                last_insert_id: 2,
                rows_affected: 1,
            },
        ])
        .into_connection();
    let app = build_router(db);

    let response = app
        .oneshot(post_json("/api/fund-flow/trace-upstream", trace_body(1)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    assert_eq!(body["totalChains"], 2);
    assert_eq!(body["maxDepth"], 1);
    assert_eq!(body["totalTransactions"], 2);
    assert_eq!(body["startTransaction"]["depositAmount"], 100_000.0);
    assert!(body["responseTimeMs"].is_number());

    let chains = body["chains"].as_array().unwrap();
    assert_eq!(chains.len(), 2);
    assert_eq!(chains[0]["nodes"][0]["transactionId"], SEED_TX_ID);
    assert_eq!(chains[0]["nodes"][0]["confidence"], 1.0);
    assert_eq!(chains[0]["nodes"][1]["transactionId"], W_EXACT_ID);

    let exact_confidence = chains[0]["nodes"][1]["confidence"].as_f64().unwrap();
    let near_confidence = chains[1]["nodes"][1]["confidence"].as_f64().unwrap();
    assert!(exact_confidence > near_confidence);
}

/// An amount-range filter narrows the result to chains with at least one
/// node inside the range.
#[tokio::test]
async fn test_trace_upstream_with_amount_filter() {
    let seed = deposit(SEED_TX_ID, date(2025, 6, 15), 100_000);
    let w_exact = withdrawal(W_EXACT_ID, date(2025, 6, 14), 100_000);
    let w_near = withdrawal(W_NEAR_ID, date(2025, 6, 13), 95_000);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([
            vec![seed.clone()],
            vec![seed.clone()],
            vec![w_exact, w_near],
        ])
        .append_exec_results([
            MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            },
            MockExecResult {
                last_insert_id: 2,
                rows_affected: 1,
            },
        ])
        .into_connection();
    let app = build_router(db);

    let mut body = trace_body(1);
    body["filters"] = json!({"amountRange": {"min": 94_000.0, "max": 96_000.0}});

    let response = app
        .oneshot(post_json("/api/fund-flow/trace-upstream", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    // Only the 95,000 chain has a node inside [94k, 96k]
    assert_eq!(body["totalChains"], 1);
    let chains = body["chains"].as_array().unwrap();
    assert_eq!(chains[0]["nodes"][1]["transactionId"], W_NEAR_ID);
}

#[tokio::test]
async fn test_trace_unknown_transaction_is_404() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<transactions::Model>::new()])
        .into_connection();
    let app = build_router(db);

    let response = app
        .oneshot(post_json("/api/fund-flow/trace-upstream", trace_body(3)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_trace_case_mismatch_is_400() {
    let mut seed = deposit(SEED_TX_ID, date(2025, 6, 15), 100_000);
    seed.case_id = "11111111-2222-4333-8444-555555555555".to_string();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![seed]])
        .into_connection();
    let app = build_router(db);

    let response = app
        .oneshot(post_json("/api/fund-flow/trace-upstream", trace_body(3)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("does not belong"));
}

#[tokio::test]
async fn test_trace_rejects_out_of_range_parameters() {
    let app = build_router(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

    let mut body = trace_body(3);
    body["amountTolerance"] = json!(0.0);
    let response = app
        .clone()
        .oneshot(post_json("/api/fund-flow/trace-upstream", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json("/api/fund-flow/trace-upstream", trace_body(6)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Tracing downstream from a deposit-only transaction is a direction error.
#[tokio::test]
async fn test_trace_downstream_from_deposit_is_400() {
    let seed = deposit(SEED_TX_ID, date(2025, 6, 15), 100_000);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![seed]])
        .into_connection();
    let app = build_router(db);

    let response = app
        .oneshot(post_json("/api/fund-flow/trace-downstream", trace_body(3)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("not a withdrawal"));
}

/// Saving the same chain twice is intentionally NOT deduplicated; each save
/// creates its own row.
#[tokio::test]
async fn test_save_chain_twice_creates_two_rows() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([
            vec![chain_row(1, 3, SEED_TX_ID, END_TX_ID)],
            vec![chain_row(2, 3, SEED_TX_ID, END_TX_ID)],
        ])
        .into_connection();
    let app = build_router(db);

    let body = json!({
        "caseId": CASE_ID,
        "startTxId": SEED_TX_ID,
        "endTxId": END_TX_ID,
        "chainType": "UPSTREAM",
        "chainDepth": 3,
        "path": format!("{SEED_TX_ID},{END_TX_ID}"),
        "totalAmount": 195000.0,
    });

    let first = app
        .clone()
        .oneshot(post_json("/api/fund-flow/chains", body.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = response_json(first).await;

    let second = app
        .oneshot(post_json("/api/fund-flow/chains", body))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second = response_json(second).await;

    assert_eq!(first["success"], true);
    assert_eq!(second["success"], true);
    assert_ne!(first["chainId"], second["chainId"]);
}

/// Saved chains come back deepest first, expanded with start/end summaries.
#[tokio::test]
async fn test_get_saved_chains_deepest_first_with_summaries() {
    let start = deposit(SEED_TX_ID, date(2025, 6, 15), 100_000);
    let end_a = withdrawal(END_TX_ID, date(2025, 6, 10), 95_000);
    let end_b = withdrawal(W_EXACT_ID, date(2025, 6, 12), 100_000);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            chain_row(7, 5, SEED_TX_ID, END_TX_ID),
            chain_row(3, 2, SEED_TX_ID, W_EXACT_ID),
        ]])
        .append_query_results([vec![start, end_a, end_b]])
        .into_connection();
    let app = build_router(db);

    let response = app
        .oneshot(get_request(&format!(
            "/api/fund-flow/chains?caseId={CASE_ID}&chainType=UPSTREAM"
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    assert_eq!(body["totalChains"], 2);
    let chains = body["chains"].as_array().unwrap();
    assert_eq!(chains[0]["chainDepth"], 5);
    assert_eq!(chains[1]["chainDepth"], 2);
    assert_eq!(chains[0]["totalAmount"], 195_000.0);
    assert_eq!(chains[0]["startTx"]["depositAmount"], 100_000.0);
    assert_eq!(chains[0]["endTx"]["withdrawalAmount"], 95_000.0);
}

/// Saving a filter under an existing name updates it in place.
#[tokio::test]
async fn test_save_filter_upserts_by_user_and_name() {
    let user = "investigator-7";
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<saved_filters::Model>::new()])
        .append_query_results([vec![filter_row(11, user, "big transfers")]])
        .append_query_results([vec![filter_row(11, user, "big transfers")]])
        .append_query_results([vec![filter_row(11, user, "big transfers")]])
        .into_connection();
    let app = build_router(db);

    let body = json!({
        "userId": user,
        "name": "big transfers",
        "filters": {"amountRange": {"min": 0.0, "max": 100000.0}},
    });

    let first = app
        .clone()
        .oneshot(post_json("/api/fund-flow/filters", body.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = response_json(first).await;
    assert_eq!(first["id"], 11);

    let second = app
        .oneshot(post_json("/api/fund-flow/filters", body))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second = response_json(second).await;
    assert_eq!(second["id"], 11);
}

#[tokio::test]
async fn test_get_saved_filters_lists_for_user() {
    let user = "investigator-7";
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![filter_row(11, user, "big transfers")]])
        .into_connection();
    let app = build_router(db);

    let response = app
        .oneshot(get_request(&format!("/api/fund-flow/filters?userId={user}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["totalFilters"], 1);
    assert_eq!(body["filters"][0]["name"], "big transfers");
    assert_eq!(
        body["filters"][0]["filters"]["amountRange"]["max"],
        100_000.0
    );
}

#[tokio::test]
async fn test_delete_saved_filter_checks_owner() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![filter_row(11, "investigator-7", "big transfers")]])
        .into_connection();
    let app = build_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/fund-flow/filters/11?userId=someone-else")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_saved_filter_success() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![filter_row(11, "investigator-7", "big transfers")]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();
    let app = build_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/fund-flow/filters/11?userId=investigator-7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
}
