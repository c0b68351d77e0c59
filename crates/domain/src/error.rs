//! Service error types.

use common::{Money, OrderId, ParsePaymentStatusError, ProductId};
use store::StoreError;
use thiserror::Error;

/// Lifecycle transition cascaded from an order to its line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Trash,
    Restore,
    DeletePermanent,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Trash => write!(f, "trash"),
            Transition::Restore => write!(f, "restore"),
            Transition::DeletePermanent => write!(f, "permanently delete"),
        }
    }
}

/// Errors returned by the fulfillment and settlement services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A referenced merchant, cashier, product, order, line item or
    /// transaction does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The product has no units available.
    #[error("Product {product_id} is out of stock")]
    OutOfStock { product_id: ProductId },

    /// A line asked for zero units.
    #[error("Invalid quantity {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// A line total or the order total does not fit in a money amount.
    #[error("Total of order {order_id} is out of range")]
    AmountOverflow { order_id: OrderId },

    /// The payment status is not one of pending, paid or failed.
    #[error(transparent)]
    InvalidPaymentStatus(#[from] ParsePaymentStatusError),

    /// A payment marked paid does not cover the order total.
    #[error("Insufficient amount: {amount} tendered against an order total of {total}")]
    InsufficientAmount { amount: Money, total: Money },

    /// A payment marked failed tenders enough to cover the order total.
    #[error("Invalid amount for a failed payment: {amount} covers the order total of {total}")]
    InvalidFailedAmount { amount: Money, total: Money },

    /// The line items of an order were transitioned but the order itself
    /// was not. The two are left out of step.
    #[error("Failed to {transition} order {order_id} after its line items: {source}")]
    CascadeIncomplete {
        order_id: OrderId,
        transition: Transition,
        #[source]
        source: StoreError,
    },

    /// Bulk variant of [`ServiceError::CascadeIncomplete`].
    #[error("Failed to {transition} all orders after their line items: {source}")]
    BulkCascadeIncomplete {
        transition: Transition,
        #[source]
        source: StoreError,
    },

    /// Any other storage failure.
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns a stable snake_case name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::OutOfStock { .. } => "out_of_stock",
            ServiceError::InvalidQuantity { .. } => "invalid_quantity",
            ServiceError::AmountOverflow { .. } => "amount_overflow",
            ServiceError::InvalidPaymentStatus(_) => "invalid_payment_status",
            ServiceError::InsufficientAmount { .. } => "insufficient_amount",
            ServiceError::InvalidFailedAmount { .. } => "invalid_failed_amount",
            ServiceError::CascadeIncomplete { .. } | ServiceError::BulkCascadeIncomplete { .. } => {
                "cascade_incomplete"
            }
            ServiceError::Storage(_) => "storage_failure",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            StoreError::AmountOverflow { order_id } => ServiceError::AmountOverflow { order_id },
            other => ServiceError::Storage(other),
        }
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
