//! Storage layer for the point-of-sale backend.
//!
//! The services in the `domain` crate consume storage only through the
//! repository traits in [`repository`]. Two implementations are provided:
//! - [`InMemoryStore`] for tests and local runs
//! - [`PostgresStore`] backed by a `sqlx` connection pool

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

pub use common::{
    CashierId, MerchantId, Money, OrderId, OrderItemId, PaymentStatus, ProductId, TransactionId,
};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use models::{
    Cashier, Merchant, NewOrder, NewOrderItem, NewTransaction, Order, OrderItem, OrderItemUpdate,
    Product, Transaction, TransactionUpdate,
};
pub use postgres::PostgresStore;
pub use repository::{
    CashierRepository, MerchantRepository, OrderItemRepository, OrderRepository, PosStore,
    ProductRepository, TransactionRepository,
};
