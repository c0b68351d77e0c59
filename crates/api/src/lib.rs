//! HTTP API server for the point-of-sale order and payment core.
//!
//! Exposes the fulfillment and settlement services over JSON endpoints,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use domain::{OrderService, TransactionService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::PosStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: PosStore> {
    pub orders: OrderService<S>,
    pub transactions: TransactionService<S>,
}

impl<S: PosStore + Clone> AppState<S> {
    /// Builds both services over one store.
    pub fn new(store: S) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            transactions: TransactionService::new(store),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: PosStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/trashed", get(routes::orders::list_trashed::<S>))
        .route("/orders/restore-all", post(routes::orders::restore_all::<S>))
        .route(
            "/orders/permanent-all",
            delete(routes::orders::delete_all_permanent::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>).put(routes::orders::update::<S>),
        )
        .route("/orders/{id}/trash", post(routes::orders::trash::<S>))
        .route("/orders/{id}/restore", post(routes::orders::restore::<S>))
        .route(
            "/orders/{id}/permanent",
            delete(routes::orders::delete_permanent::<S>),
        )
        .route(
            "/orders/{id}/transactions",
            get(routes::transactions::list_by_order::<S>),
        )
        .route(
            "/merchants/{id}/orders",
            get(routes::orders::list_by_merchant::<S>),
        )
        .route(
            "/merchants/{id}/transactions",
            get(routes::transactions::list_by_merchant::<S>),
        )
        .route("/transactions", post(routes::transactions::create::<S>))
        .route(
            "/transactions/restore-all",
            post(routes::transactions::restore_all::<S>),
        )
        .route(
            "/transactions/permanent-all",
            delete(routes::transactions::delete_all_permanent::<S>),
        )
        .route(
            "/transactions/{id}",
            get(routes::transactions::get::<S>).put(routes::transactions::update::<S>),
        )
        .route(
            "/transactions/{id}/trash",
            post(routes::transactions::trash::<S>),
        )
        .route(
            "/transactions/{id}/restore",
            post(routes::transactions::restore::<S>),
        )
        .route(
            "/transactions/{id}/permanent",
            delete(routes::transactions::delete_permanent::<S>),
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

/// Registers descriptions for the metrics recorded by the services.
pub fn describe_metrics() {
    metrics::describe_counter!("orders_created_total", "Orders created");
    metrics::describe_counter!("order_items_created_total", "Order lines placed");
    metrics::describe_counter!("transactions_created_total", "Payments recorded");
    metrics::describe_counter!(
        "settlement_rejections_total",
        "Payments rejected during settlement, by reason"
    );
    metrics::describe_histogram!(
        "order_create_duration_seconds",
        metrics::Unit::Seconds,
        "Time taken to create an order with its lines"
    );
}

/// Creates the application state over the given store.
pub fn create_state<S: PosStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store))
}
