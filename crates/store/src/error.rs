use common::{OrderId, ParsePaymentStatusError};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record does not exist, or is not in the lifecycle state the
    /// operation requires (live for trash/update, trashed for restore/delete).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The record cannot be permanently deleted while other rows point at it.
    #[error("{entity} is still referenced by a {referrer}")]
    Referenced {
        entity: &'static str,
        referrer: &'static str,
    },

    /// The sum of `price * quantity` over the lines of an order does not fit
    /// in a money amount.
    #[error("Total of order {order_id} is out of range")]
    AmountOverflow { order_id: OrderId },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value does not fit the domain type it maps to.
    #[error("Invalid value {value} in column {column}")]
    InvalidColumn { column: &'static str, value: i64 },

    /// A stored payment status is not one of the known values.
    #[error("Invalid stored payment status: {0}")]
    InvalidPaymentStatus(#[from] ParsePaymentStatusError),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns true if this error reports a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
