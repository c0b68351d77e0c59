//! Repository traits consumed by the fulfillment and settlement services.
//!
//! Lookups return `Ok(None)` for missing records. Lifecycle operations on a
//! single record return [`StoreError::NotFound`](crate::StoreError::NotFound)
//! when the record is missing or not in the state the operation requires:
//! trash and update act on live records, restore and permanent delete act on
//! trashed ones. Bulk lifecycle operations return the number of rows touched.
//!
//! Every call is its own commit point. Callers composing several calls get
//! no atomicity across them.

use async_trait::async_trait;
use common::{CashierId, MerchantId, Money, OrderId, OrderItemId, ProductId, TransactionId};

use crate::Result;
use crate::models::{
    Cashier, Merchant, NewOrder, NewOrderItem, NewTransaction, Order, OrderItem, OrderItemUpdate,
    Product, Transaction, TransactionUpdate,
};

/// Merchant existence lookups.
#[async_trait]
pub trait MerchantRepository: Send + Sync {
    /// Finds a live merchant.
    async fn find_merchant(&self, id: MerchantId) -> Result<Option<Merchant>>;
}

/// Cashier existence lookups.
#[async_trait]
pub trait CashierRepository: Send + Sync {
    /// Finds a live cashier.
    async fn find_cashier(&self, id: CashierId) -> Result<Option<Cashier>>;
}

/// Product lookups and the stock ledger.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Finds a live product.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Overwrites the stock count of a product.
    async fn update_stock(&self, id: ProductId, count_in_stock: u32) -> Result<Product>;

    /// Atomically removes `quantity` units from stock.
    ///
    /// The decrement only happens if at least `quantity` units are
    /// available. Returns `None` when the product is missing or short of
    /// stock, in which case nothing was written.
    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<Option<Product>>;
}

/// Storage of orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create_order(&self, order: NewOrder) -> Result<Order>;

    /// Finds a live order.
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Finds a trashed order.
    async fn find_trashed_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists the live orders of a merchant, newest first.
    async fn find_orders_by_merchant(&self, merchant_id: MerchantId) -> Result<Vec<Order>>;

    /// Lists trashed orders, newest first.
    async fn find_trashed_orders(&self) -> Result<Vec<Order>>;

    /// Writes a recomputed total onto a live order.
    async fn update_order_total(&self, id: OrderId, total_price: Money) -> Result<Order>;

    async fn trash_order(&self, id: OrderId) -> Result<Order>;

    async fn restore_order(&self, id: OrderId) -> Result<Order>;

    async fn delete_order_permanent(&self, id: OrderId) -> Result<()>;

    async fn restore_all_orders(&self) -> Result<u64>;

    async fn delete_all_orders_permanent(&self) -> Result<u64>;
}

/// Storage of order line items.
#[async_trait]
pub trait OrderItemRepository: Send + Sync {
    async fn create_order_item(&self, item: NewOrderItem) -> Result<OrderItem>;

    /// Rewrites product, quantity and price of a live line item.
    async fn update_order_item(&self, update: OrderItemUpdate) -> Result<OrderItem>;

    /// Finds a live line item.
    async fn find_order_item(&self, id: OrderItemId) -> Result<Option<OrderItem>>;

    /// Lists the live line items of an order in creation order.
    async fn find_order_items_by_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Lists the trashed line items of an order in creation order.
    async fn find_trashed_order_items_by_order(&self, order_id: OrderId)
    -> Result<Vec<OrderItem>>;

    /// Sums `price * quantity` over the live line items of an order.
    async fn total_price_by_order(&self, order_id: OrderId) -> Result<Money>;

    async fn trash_order_item(&self, id: OrderItemId) -> Result<OrderItem>;

    async fn restore_order_item(&self, id: OrderItemId) -> Result<OrderItem>;

    async fn delete_order_item_permanent(&self, id: OrderItemId) -> Result<()>;

    async fn restore_all_order_items(&self) -> Result<u64>;

    async fn delete_all_order_items_permanent(&self) -> Result<u64>;
}

/// Storage of payment transactions.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create_transaction(&self, transaction: NewTransaction) -> Result<Transaction>;

    /// Rewrites a live transaction.
    async fn update_transaction(&self, update: TransactionUpdate) -> Result<Transaction>;

    /// Finds a live transaction.
    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>>;

    /// Lists the live transactions recorded against an order, oldest first.
    async fn find_transactions_by_order(&self, order_id: OrderId) -> Result<Vec<Transaction>>;

    /// Lists the live transactions of a merchant, newest first.
    async fn find_transactions_by_merchant(
        &self,
        merchant_id: MerchantId,
    ) -> Result<Vec<Transaction>>;

    async fn trash_transaction(&self, id: TransactionId) -> Result<Transaction>;

    async fn restore_transaction(&self, id: TransactionId) -> Result<Transaction>;

    async fn delete_transaction_permanent(&self, id: TransactionId) -> Result<()>;

    async fn restore_all_transactions(&self) -> Result<u64>;

    async fn delete_all_transactions_permanent(&self) -> Result<u64>;
}

/// Every repository the services need, behind one handle.
pub trait PosStore:
    MerchantRepository
    + CashierRepository
    + ProductRepository
    + OrderRepository
    + OrderItemRepository
    + TransactionRepository
{
}

impl<T> PosStore for T where
    T: MerchantRepository
        + CashierRepository
        + ProductRepository
        + OrderRepository
        + OrderItemRepository
        + TransactionRepository
{
}
