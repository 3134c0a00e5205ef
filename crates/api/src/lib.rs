//! HTTP API server for the order-management service.
//!
//! Provides REST endpoints for the order lifecycle, catalog and customer
//! maintenance, and reporting, with structured logging (tracing) and
//! Prometheus metrics. Authentication happens upstream; see [`auth`].

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use engine::OrderEngine;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub engine: OrderEngine<S>,
    pub store: S,
}

/// Creates the application state for the given store backend.
pub fn create_state<S: Store + Clone>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        engine: OrderEngine::new(store.clone()),
        store,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::place::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/pay", post(routes::orders::pay::<S>))
        .route("/orders/{id}/fulfill", post(routes::orders::fulfill::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{sku}", put(routes::products::update::<S>))
        .route("/products/{sku}", delete(routes::products::delete::<S>))
        .route("/customers", post(routes::customers::create::<S>))
        .route("/customers", get(routes::customers::list::<S>))
        .route("/customers/{id}", get(routes::customers::get::<S>))
        .route("/reports/stock", get(routes::reports::stock::<S>))
        .route("/reports/orders", get(routes::reports::orders::<S>))
        .route(
            "/reports/sales-summary",
            get(routes::reports::sales_summary::<S>),
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
