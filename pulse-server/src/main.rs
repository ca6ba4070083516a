use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod pipeline;
pub mod repository;
pub mod service;
pub mod store;

use crate::clients::{HttpSourceClient, HttpTransformerClient};
use crate::pipeline::PipelineExecutor;
use crate::store::{PgStore, Store};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Pulse server...");

    // Load configuration from environment
    let config = config::Config::from_env().expect("Invalid configuration");

    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Database connection pool created");

    // Run migrations
    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // Wire up the store, collaborator clients, and pipeline executor
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let source = Arc::new(HttpSourceClient::new(config.source_proxy_url.clone()));
    let transformer = Arc::new(HttpTransformerClient::new(config.transformer_url.clone()));
    let executor = Arc::new(PipelineExecutor::new(
        store.clone(),
        source,
        transformer,
        config.step_timeout,
    ));

    // Build router with all API endpoints
    let app = api::create_router(api::AppState {
        store,
        executor,
        lease_timeout: config.lease_timeout,
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
