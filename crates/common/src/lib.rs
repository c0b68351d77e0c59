//! Shared types for the point-of-sale backend.
//!
//! Every crate in the workspace speaks in these types: strongly-typed entity
//! identifiers, integer [`Money`] amounts, and the [`PaymentStatus`] of a
//! payment transaction.

mod ids;
mod money;
mod payment;

pub use ids::{CashierId, MerchantId, OrderId, OrderItemId, ProductId, TransactionId};
pub use money::Money;
pub use payment::{ParsePaymentStatusError, PaymentStatus};
