//! HTTP API server with observability for the canteen ordering system.
//!
//! Exposes the menu and order endpoints used by the customer and kitchen
//! clients, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, put};
use engine::{EngineConfig, OrderEngine};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InventoryLedger, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L, O>(state: Arc<AppState<L, O>>, metrics_handle: PrometheusHandle) -> Router
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    Router::new()
        .route("/api/health", get(routes::health::check))
        .route("/api/menu", get(routes::menu::list::<L, O>))
        .route(
            "/api/menu/categories/list",
            get(routes::menu::categories::<L, O>),
        )
        .route("/api/menu/{id}", get(routes::menu::get::<L, O>))
        .route(
            "/api/menu/{id}/stock",
            patch(routes::menu::adjust_stock::<L, O>),
        )
        .route(
            "/api/orders",
            get(routes::orders::list::<L, O>).post(routes::orders::create::<L, O>),
        )
        .route(
            "/api/orders/stats/summary",
            get(routes::orders::stats::<L, O>),
        )
        .route(
            "/api/orders/number/{order_number}",
            get(routes::orders::get_by_number::<L, O>),
        )
        .route(
            "/api/orders/customer/{phone}",
            get(routes::orders::list_by_customer::<L, O>),
        )
        .route(
            "/api/orders/{id}",
            get(routes::orders::get::<L, O>).delete(routes::orders::cancel::<L, O>),
        )
        .route(
            "/api/orders/{id}/status",
            put(routes::orders::update_status::<L, O>),
        )
        .with_state(state)
        .merge(routes::metrics::router(metrics_handle))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around a ledger and an order store.
pub fn create_state<L, O>(ledger: L, orders: O, config: EngineConfig) -> Arc<AppState<L, O>>
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    Arc::new(AppState::new(OrderEngine::with_config(ledger, orders, config)))
}
