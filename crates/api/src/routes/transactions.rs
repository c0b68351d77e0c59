//! Payment settlement endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{MerchantId, Money, OrderId, TransactionId};
use domain::{CreateTransaction, UpdateTransaction};
use serde::Deserialize;
use store::{PosStore, Transaction};

use super::SuccessResponse;
use crate::AppState;
use crate::error::ApiError;

/// Body of both the create and the update request.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub order_id: OrderId,
    pub merchant_id: MerchantId,
    pub payment_method: String,
    pub amount: Money,
    pub payment_status: String,
}

impl TransactionRequest {
    fn into_command(self) -> Result<CreateTransaction, ApiError> {
        if self.payment_method.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "payment_method must not be empty".to_string(),
            ));
        }
        Ok(CreateTransaction::new(
            self.order_id,
            self.merchant_id,
            self.payment_method,
            self.amount,
            self.payment_status,
        ))
    }
}

/// POST /transactions: settle a payment against an order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<TransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let transaction = state
        .transactions
        .create_transaction(req.into_command()?)
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// GET /transactions/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<TransactionId>,
) -> Result<Json<Transaction>, ApiError> {
    Ok(Json(state.transactions.find_transaction(id).await?))
}

/// PUT /transactions/{id}: re-settle a recorded payment.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<TransactionId>,
    Json(req): Json<TransactionRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let cmd = UpdateTransaction::new(id, req.into_command()?);
    Ok(Json(state.transactions.update_transaction(cmd).await?))
}

/// GET /orders/{id}/transactions
#[tracing::instrument(skip(state))]
pub async fn list_by_order<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    Ok(Json(
        state.transactions.list_transactions_by_order(order_id).await?,
    ))
}

/// GET /merchants/{id}/transactions
#[tracing::instrument(skip(state))]
pub async fn list_by_merchant<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(merchant_id): Path<MerchantId>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    Ok(Json(
        state
            .transactions
            .list_transactions_by_merchant(merchant_id)
            .await?,
    ))
}

/// POST /transactions/{id}/trash
#[tracing::instrument(skip(state))]
pub async fn trash<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<TransactionId>,
) -> Result<Json<Transaction>, ApiError> {
    Ok(Json(state.transactions.trash_transaction(id).await?))
}

/// POST /transactions/{id}/restore
#[tracing::instrument(skip(state))]
pub async fn restore<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<TransactionId>,
) -> Result<Json<Transaction>, ApiError> {
    Ok(Json(state.transactions.restore_transaction(id).await?))
}

/// DELETE /transactions/{id}/permanent
#[tracing::instrument(skip(state))]
pub async fn delete_permanent<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<TransactionId>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let success = state.transactions.delete_transaction_permanent(id).await?;
    Ok(Json(SuccessResponse { success }))
}

/// POST /transactions/restore-all
#[tracing::instrument(skip(state))]
pub async fn restore_all<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let success = state.transactions.restore_all_transactions().await?;
    Ok(Json(SuccessResponse { success }))
}

/// DELETE /transactions/permanent-all
#[tracing::instrument(skip(state))]
pub async fn delete_all_permanent<S: PosStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let success = state.transactions.delete_all_transactions_permanent().await?;
    Ok(Json(SuccessResponse { success }))
}
