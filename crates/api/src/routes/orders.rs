//! Order fulfillment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CashierId, MerchantId, OrderId, OrderItemId, ProductId};
use domain::{CreateOrder, LineItem, OrderDetails, OrderLine, UpdateOrder};
use serde::Deserialize;
use store::{Order, PosStore};

use super::SuccessResponse;
use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub merchant_id: MerchantId,
    pub cashier_id: CashierId,
    pub items: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub items: Vec<UpdateOrderItemRequest>,
}

/// A line of an order edit. Lines without a positive `order_item_id` are
/// placed as new lines.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderItemRequest {
    #[serde(default)]
    pub order_item_id: Option<OrderItemId>,
    pub product_id: ProductId,
    pub quantity: u32,
}

// -- Handlers --

/// POST /orders: create an order with its lines.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state
        .orders
        .create_order(CreateOrder {
            merchant_id: req.merchant_id,
            cashier_id: req.cashier_id,
            items: req.items,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/{id}: load a live order with its lines.
#[tracing::instrument(skip(state))]
pub async fn get<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetails>, ApiError> {
    Ok(Json(state.orders.find_order(id).await?))
}

/// PUT /orders/{id}: edit the lines of an order.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
    let items = req
        .items
        .into_iter()
        .map(|line| OrderLine::from_item_id(line.order_item_id, line.product_id, line.quantity))
        .collect();

    let order = state
        .orders
        .update_order(UpdateOrder {
            order_id: id,
            items,
        })
        .await?;

    Ok(Json(order))
}

/// GET /merchants/{id}/orders: list the live orders of a merchant.
#[tracing::instrument(skip(state))]
pub async fn list_by_merchant<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(merchant_id): Path<MerchantId>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_orders_by_merchant(merchant_id).await?))
}

/// GET /orders/trashed
#[tracing::instrument(skip(state))]
pub async fn list_trashed<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_trashed_orders().await?))
}

/// POST /orders/{id}/trash
#[tracing::instrument(skip(state))]
pub async fn trash<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.trash_order(id).await?))
}

/// POST /orders/{id}/restore
#[tracing::instrument(skip(state))]
pub async fn restore<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.restore_order(id).await?))
}

/// DELETE /orders/{id}/permanent
#[tracing::instrument(skip(state))]
pub async fn delete_permanent<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let success = state.orders.delete_order_permanent(id).await?;
    Ok(Json(SuccessResponse { success }))
}

/// POST /orders/restore-all
#[tracing::instrument(skip(state))]
pub async fn restore_all<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let success = state.orders.restore_all_orders().await?;
    Ok(Json(SuccessResponse { success }))
}

/// DELETE /orders/permanent-all
#[tracing::instrument(skip(state))]
pub async fn delete_all_permanent<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let success = state.orders.delete_all_orders_permanent().await?;
    Ok(Json(SuccessResponse { success }))
}
