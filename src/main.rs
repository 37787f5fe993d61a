use axum::{
    Router,
    routing::{delete, get, post},
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::env;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fundtrace_backend::{AppState, handlers};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fundtrace_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Connect to database
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let state = AppState { db: Arc::new(db) };

    // Build router
    let app = Router::new()
        .route("/", get(health))
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
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .unwrap();

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}

async fn health() -> &'static str {
    "fundtrace backend up"
}
