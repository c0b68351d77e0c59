//! Records persisted by the store, and the inputs used to create or update them.

use chrono::{DateTime, Utc};
use common::{
    CashierId, MerchantId, Money, OrderId, OrderItemId, PaymentStatus, ProductId, TransactionId,
};
use serde::{Deserialize, Serialize};

/// A shop owning products, cashiers and orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub id: MerchantId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Merchant {
    pub const ENTITY: &'static str = "merchant";
}

/// A cashier operating a till on behalf of a merchant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cashier {
    pub id: CashierId,
    pub merchant_id: MerchantId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Cashier {
    pub const ENTITY: &'static str = "cashier";
}

/// A catalogue product and its available stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub merchant_id: MerchantId,
    pub name: String,
    /// Current unit price. Line items copy this when they are written.
    pub price: Money,
    pub count_in_stock: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    pub const ENTITY: &'static str = "product";
}

/// An order placed at a till.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub merchant_id: MerchantId,
    pub cashier_id: CashierId,
    /// Sum of `price * quantity` over the live line items, as of the last
    /// recomputation by the fulfillment service.
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    pub const ENTITY: &'static str = "order";

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// One product/quantity/price line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price captured from the product when the line was written.
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl OrderItem {
    pub const ENTITY: &'static str = "order item";

    /// Returns `price * quantity` for this line, or `None` if it does not
    /// fit in a [`Money`].
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_multiply(self.quantity)
    }
}

/// A payment tendered against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub order_id: OrderId,
    pub merchant_id: MerchantId,
    pub payment_method: String,
    /// Amount tendered by the payer.
    pub amount: Money,
    /// `amount - order total` when paid, zero otherwise.
    pub change_amount: Money,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub const ENTITY: &'static str = "transaction";
}

/// Input for creating an order shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub merchant_id: MerchantId,
    pub cashier_id: CashierId,
    pub total_price: Money,
}

/// Input for creating a line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

/// In-place rewrite of an existing line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemUpdate {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

/// Input for recording a payment transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub order_id: OrderId,
    pub merchant_id: MerchantId,
    pub payment_method: String,
    pub amount: Money,
    pub change_amount: Money,
    pub payment_status: PaymentStatus,
}

/// In-place rewrite of an existing payment transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionUpdate {
    pub id: TransactionId,
    pub order_id: OrderId,
    pub merchant_id: MerchantId,
    pub payment_method: String,
    pub amount: Money,
    pub change_amount: Money,
    pub payment_status: PaymentStatus,
}
