//! Order fulfillment and payment settlement for the point-of-sale backend.
//!
//! This crate holds the two services that keep several records consistent
//! across a sequence of storage calls:
//! - [`OrderService`] creates and edits orders together with their line
//!   items and product stock, and cascades trash/restore/delete from an
//!   order to its line items
//! - [`TransactionService`] validates a payment against the order total
//!   computed from live line items and records it
//!
//! Both services are generic over a [`store::PosStore`].

pub mod error;
mod lookup;
pub mod order;
pub mod settlement;
pub mod transaction;

pub use error::{Result, ServiceError, Transition};
pub use order::{CreateOrder, LineItem, OrderDetails, OrderLine, OrderService, UpdateOrder};
pub use transaction::{CreateTransaction, TransactionService, UpdateTransaction};
