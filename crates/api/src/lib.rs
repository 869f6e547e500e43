//! HTTP API server with observability for the fulfillment engine.
//!
//! Provides order placement, vendor order lookup and vendor inventory
//! endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;
pub mod state;
pub mod vendor;

use std::sync::Arc;

use allocation::OrderOrchestrator;
use axum::Router;
use axum::routing::{delete, get, post, put};
use ledger::Ledger;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L: Ledger + 'static>(
    state: Arc<AppState<L>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::status::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::status::health))
        .route(
            "/orders",
            post(routes::orders::create::<L>).get(routes::orders::list::<L>),
        )
        .route("/orders/{id}", get(routes::orders::get::<L>))
        .route(
            "/vendors/me/products",
            get(routes::inventory::list::<L>).post(routes::inventory::enroll::<L>),
        )
        .route(
            "/vendors/me/products/{product_id}",
            delete(routes::inventory::unenroll::<L>),
        )
        .route(
            "/vendors/me/products/{product_id}/price",
            put(routes::inventory::update_price::<L>),
        )
        .route(
            "/vendors/me/products/{product_id}/stock",
            put(routes::inventory::update_stock::<L>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the application state for a ledger using the allocation policy
/// and response profile from `config`.
pub fn create_state<L: Ledger + 'static>(ledger: L, config: &Config) -> Arc<AppState<L>> {
    let orchestrator = OrderOrchestrator::with_policy(ledger, config.allocation_policy());
    Arc::new(AppState::new(orchestrator, config.response_profile))
}
