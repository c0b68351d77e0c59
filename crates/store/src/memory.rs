use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CashierId, MerchantId, Money, OrderId, OrderItemId, ProductId, TransactionId};
use tokio::sync::RwLock;

use crate::models::{
    Cashier, Merchant, NewOrder, NewOrderItem, NewTransaction, Order, OrderItem, OrderItemUpdate,
    Product, Transaction, TransactionUpdate,
};
use crate::repository::{
    CashierRepository, MerchantRepository, OrderItemRepository, OrderRepository,
    ProductRepository, TransactionRepository,
};
use crate::{Result, StoreError};

/// Store operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// `create_order_item`.
    CreateOrderItem,
    /// Every single and bulk trash/restore/delete on order items.
    OrderItemLifecycle,
    /// Every single and bulk trash/restore/delete on orders.
    OrderLifecycle,
}

#[derive(Debug, Default)]
struct Tables {
    merchants: BTreeMap<MerchantId, Merchant>,
    cashiers: BTreeMap<CashierId, Cashier>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    order_items: BTreeMap<OrderItemId, OrderItem>,
    transactions: BTreeMap<TransactionId, Transaction>,
    sequences: HashMap<&'static str, i64>,
    fail_points: HashSet<FailPoint>,
}

impl Tables {
    fn next_id(&mut self, entity: &'static str) -> i64 {
        let seq = self.sequences.entry(entity).or_insert(0);
        *seq += 1;
        *seq
    }

    /// True if any transaction row, live or trashed, matches the order filter.
    fn has_transactions_for(&self, order: impl Fn(OrderId) -> bool) -> bool {
        self.transactions.values().any(|t| order(t.order_id))
    }

    fn check(&self, point: FailPoint) -> Result<()> {
        if self.fail_points.contains(&point) {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "injected failure at {point:?}"
            ))));
        }
        Ok(())
    }
}

/// In-memory store implementation for tests and local runs.
///
/// Behaves like [`PostgresStore`](crate::PostgresStore), including the
/// live/trashed lifecycle rules, the conditional stock decrement and the
/// foreign key that keeps an order with transactions from being deleted.
/// Records are kept in id order, ids are assigned per table starting at 1.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a merchant.
    pub async fn insert_merchant(&self, name: impl Into<String>) -> Merchant {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let merchant = Merchant {
            id: MerchantId::new(tables.next_id(Merchant::ENTITY)),
            name: name.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.merchants.insert(merchant.id, merchant.clone());
        merchant
    }

    /// Adds a cashier working for `merchant_id`.
    pub async fn insert_cashier(
        &self,
        merchant_id: MerchantId,
        name: impl Into<String>,
    ) -> Cashier {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let cashier = Cashier {
            id: CashierId::new(tables.next_id(Cashier::ENTITY)),
            merchant_id,
            name: name.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.cashiers.insert(cashier.id, cashier.clone());
        cashier
    }

    /// Adds a product with a unit price and an initial stock count.
    pub async fn insert_product(
        &self,
        merchant_id: MerchantId,
        name: impl Into<String>,
        price: Money,
        count_in_stock: u32,
    ) -> Product {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(tables.next_id(Product::ENTITY)),
            merchant_id,
            name: name.into(),
            price,
            count_in_stock,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.products.insert(product.id, product.clone());
        product
    }

    /// Makes every call covered by `point` fail with a database error.
    pub async fn set_fail_point(&self, point: FailPoint, fail: bool) {
        let mut tables = self.tables.write().await;
        if fail {
            tables.fail_points.insert(point);
        } else {
            tables.fail_points.remove(&point);
        }
    }

    /// Returns the number of line item rows, live or trashed.
    pub async fn order_item_count(&self) -> usize {
        self.tables.read().await.order_items.len()
    }

    /// Returns the number of order rows, live or trashed.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the number of transaction rows, live or trashed.
    pub async fn transaction_count(&self) -> usize {
        self.tables.read().await.transactions.len()
    }
}

/// Records carrying a soft-delete timestamp.
trait SoftDelete: Clone {
    fn deleted_at(&self) -> Option<DateTime<Utc>>;
    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>);
}

macro_rules! soft_delete {
    ($($ty:ty),*) => {
        $(impl SoftDelete for $ty {
            fn deleted_at(&self) -> Option<DateTime<Utc>> {
                self.deleted_at
            }

            fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
                self.deleted_at = at;
            }
        })*
    };
}

soft_delete!(Product, Order, OrderItem, Transaction);

fn live<K: Ord, V: SoftDelete>(table: &BTreeMap<K, V>, id: &K) -> Option<V> {
    table.get(id).filter(|v| v.deleted_at().is_none()).cloned()
}

fn trashed<K: Ord, V: SoftDelete>(table: &BTreeMap<K, V>, id: &K) -> Option<V> {
    table.get(id).filter(|v| v.deleted_at().is_some()).cloned()
}

fn trash<K, V>(table: &mut BTreeMap<K, V>, id: K, entity: &'static str) -> Result<V>
where
    K: Ord + Copy + Into<i64>,
    V: SoftDelete,
{
    match table.get_mut(&id) {
        Some(record) if record.deleted_at().is_none() => {
            record.set_deleted_at(Some(Utc::now()));
            Ok(record.clone())
        }
        _ => Err(StoreError::not_found(entity, id)),
    }
}

fn restore<K, V>(table: &mut BTreeMap<K, V>, id: K, entity: &'static str) -> Result<V>
where
    K: Ord + Copy + Into<i64>,
    V: SoftDelete,
{
    match table.get_mut(&id) {
        Some(record) if record.deleted_at().is_some() => {
            record.set_deleted_at(None);
            Ok(record.clone())
        }
        _ => Err(StoreError::not_found(entity, id)),
    }
}

fn delete_permanent<K, V>(table: &mut BTreeMap<K, V>, id: K, entity: &'static str) -> Result<()>
where
    K: Ord + Copy + Into<i64>,
    V: SoftDelete,
{
    if table.get(&id).is_some_and(|r| r.deleted_at().is_some()) {
        table.remove(&id);
        Ok(())
    } else {
        Err(StoreError::not_found(entity, id))
    }
}

/// Mirrors the `transactions.order_id` foreign key, which restricts deletes.
fn order_referenced() -> StoreError {
    StoreError::Referenced {
        entity: Order::ENTITY,
        referrer: Transaction::ENTITY,
    }
}

fn restore_all<K: Ord, V: SoftDelete>(table: &mut BTreeMap<K, V>) -> u64 {
    let mut restored = 0;
    for record in table.values_mut().filter(|r| r.deleted_at().is_some()) {
        record.set_deleted_at(None);
        restored += 1;
    }
    restored
}

fn delete_all_permanent<K: Ord, V: SoftDelete>(table: &mut BTreeMap<K, V>) -> u64 {
    let before = table.len();
    table.retain(|_, r| r.deleted_at().is_none());
    (before - table.len()) as u64
}

#[async_trait]
impl MerchantRepository for InMemoryStore {
    async fn find_merchant(&self, id: MerchantId) -> Result<Option<Merchant>> {
        let tables = self.tables.read().await;
        Ok(tables
            .merchants
            .get(&id)
            .filter(|m| m.deleted_at.is_none())
            .cloned())
    }
}

#[async_trait]
impl CashierRepository for InMemoryStore {
    async fn find_cashier(&self, id: CashierId) -> Result<Option<Cashier>> {
        let tables = self.tables.read().await;
        Ok(tables
            .cashiers
            .get(&id)
            .filter(|c| c.deleted_at.is_none())
            .cloned())
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(live(&self.tables.read().await.products, &id))
    }

    async fn update_stock(&self, id: ProductId, count_in_stock: u32) -> Result<Product> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(&id)
            .filter(|p| p.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found(Product::ENTITY, id))?;
        product.count_in_stock = count_in_stock;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        let Some(product) = tables
            .products
            .get_mut(&id)
            .filter(|p| p.deleted_at.is_none())
        else {
            return Ok(None);
        };
        match product.count_in_stock.checked_sub(quantity) {
            Some(remaining) => {
                product.count_in_stock = remaining;
                product.updated_at = Utc::now();
                Ok(Some(product.clone()))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(tables.next_id(Order::ENTITY)),
            merchant_id: order.merchant_id,
            cashier_id: order.cashier_id,
            total_price: order.total_price,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(live(&self.tables.read().await.orders, &id))
    }

    async fn find_trashed_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(trashed(&self.tables.read().await.orders, &id))
    }

    async fn find_orders_by_merchant(&self, merchant_id: MerchantId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .rev()
            .filter(|o| o.merchant_id == merchant_id && o.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn find_trashed_orders(&self) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .rev()
            .filter(|o| o.deleted_at.is_some())
            .cloned()
            .collect())
    }

    async fn update_order_total(&self, id: OrderId, total_price: Money) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&id)
            .filter(|o| o.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found(Order::ENTITY, id))?;
        order.total_price = total_price;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn trash_order(&self, id: OrderId) -> Result<Order> {
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::OrderLifecycle)?;
        trash(&mut tables.orders, id, Order::ENTITY)
    }

    async fn restore_order(&self, id: OrderId) -> Result<Order> {
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::OrderLifecycle)?;
        restore(&mut tables.orders, id, Order::ENTITY)
    }

    async fn delete_order_permanent(&self, id: OrderId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::OrderLifecycle)?;
        let trashed = tables.orders.get(&id).is_some_and(|o| o.deleted_at.is_some());
        if trashed && tables.has_transactions_for(|order_id| order_id == id) {
            return Err(order_referenced());
        }
        delete_permanent(&mut tables.orders, id, Order::ENTITY)
    }

    async fn restore_all_orders(&self) -> Result<u64> {
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::OrderLifecycle)?;
        Ok(restore_all(&mut tables.orders))
    }

    async fn delete_all_orders_permanent(&self) -> Result<u64> {
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::OrderLifecycle)?;
        let trashed: Vec<OrderId> = tables
            .orders
            .values()
            .filter(|o| o.deleted_at.is_some())
            .map(|o| o.id)
            .collect();
        if tables.has_transactions_for(|order_id| trashed.contains(&order_id)) {
            return Err(order_referenced());
        }
        Ok(delete_all_permanent(&mut tables.orders))
    }
}

#[async_trait]
impl OrderItemRepository for InMemoryStore {
    async fn create_order_item(&self, item: NewOrderItem) -> Result<OrderItem> {
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::CreateOrderItem)?;
        let now = Utc::now();
        let item = OrderItem {
            id: OrderItemId::new(tables.next_id(OrderItem::ENTITY)),
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.order_items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_order_item(&self, update: OrderItemUpdate) -> Result<OrderItem> {
        let mut tables = self.tables.write().await;
        let item = tables
            .order_items
            .get_mut(&update.id)
            .filter(|i| i.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found(OrderItem::ENTITY, update.id))?;
        item.product_id = update.product_id;
        item.quantity = update.quantity;
        item.price = update.price;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn find_order_item(&self, id: OrderItemId) -> Result<Option<OrderItem>> {
        Ok(live(&self.tables.read().await.order_items, &id))
    }

    async fn find_order_items_by_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .order_items
            .values()
            .filter(|i| i.order_id == order_id && i.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn find_trashed_order_items_by_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<OrderItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .order_items
            .values()
            .filter(|i| i.order_id == order_id && i.deleted_at.is_some())
            .cloned()
            .collect())
    }

    async fn total_price_by_order(&self, order_id: OrderId) -> Result<Money> {
        let tables = self.tables.read().await;
        tables
            .order_items
            .values()
            .filter(|i| i.order_id == order_id && i.deleted_at.is_none())
            .try_fold(Money::zero(), |total, item| total.checked_add(item.line_total()?))
            .ok_or(StoreError::AmountOverflow { order_id })
    }

    async fn trash_order_item(&self, id: OrderItemId) -> Result<OrderItem> {
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::OrderItemLifecycle)?;
        trash(&mut tables.order_items, id, OrderItem::ENTITY)
    }

    async fn restore_order_item(&self, id: OrderItemId) -> Result<OrderItem> {
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::OrderItemLifecycle)?;
        restore(&mut tables.order_items, id, OrderItem::ENTITY)
    }

    async fn delete_order_item_permanent(&self, id: OrderItemId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::OrderItemLifecycle)?;
        delete_permanent(&mut tables.order_items, id, OrderItem::ENTITY)
    }

    async fn restore_all_order_items(&self) -> Result<u64> {
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::OrderItemLifecycle)?;
        Ok(restore_all(&mut tables.order_items))
    }

    async fn delete_all_order_items_permanent(&self) -> Result<u64> {
        let mut tables = self.tables.write().await;
        tables.check(FailPoint::OrderItemLifecycle)?;
        Ok(delete_all_permanent(&mut tables.order_items))
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn create_transaction(&self, transaction: NewTransaction) -> Result<Transaction> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let transaction = Transaction {
            id: TransactionId::new(tables.next_id(Transaction::ENTITY)),
            order_id: transaction.order_id,
            merchant_id: transaction.merchant_id,
            payment_method: transaction.payment_method,
            amount: transaction.amount,
            change_amount: transaction.change_amount,
            payment_status: transaction.payment_status,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn update_transaction(&self, update: TransactionUpdate) -> Result<Transaction> {
        let mut tables = self.tables.write().await;
        let transaction = tables
            .transactions
            .get_mut(&update.id)
            .filter(|t| t.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found(Transaction::ENTITY, update.id))?;
        transaction.order_id = update.order_id;
        transaction.merchant_id = update.merchant_id;
        transaction.payment_method = update.payment_method;
        transaction.amount = update.amount;
        transaction.change_amount = update.change_amount;
        transaction.payment_status = update.payment_status;
        transaction.updated_at = Utc::now();
        Ok(transaction.clone())
    }

    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        Ok(live(&self.tables.read().await.transactions, &id))
    }

    async fn find_transactions_by_order(&self, order_id: OrderId) -> Result<Vec<Transaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .values()
            .filter(|t| t.order_id == order_id && t.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn find_transactions_by_merchant(
        &self,
        merchant_id: MerchantId,
    ) -> Result<Vec<Transaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .values()
            .rev()
            .filter(|t| t.merchant_id == merchant_id && t.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn trash_transaction(&self, id: TransactionId) -> Result<Transaction> {
        let mut tables = self.tables.write().await;
        trash(&mut tables.transactions, id, Transaction::ENTITY)
    }

    async fn restore_transaction(&self, id: TransactionId) -> Result<Transaction> {
        let mut tables = self.tables.write().await;
        restore(&mut tables.transactions, id, Transaction::ENTITY)
    }

    async fn delete_transaction_permanent(&self, id: TransactionId) -> Result<()> {
        let mut tables = self.tables.write().await;
        delete_permanent(&mut tables.transactions, id, Transaction::ENTITY)
    }

    async fn restore_all_transactions(&self) -> Result<u64> {
        let mut tables = self.tables.write().await;
        Ok(restore_all(&mut tables.transactions))
    }

    async fn delete_all_transactions_permanent(&self) -> Result<u64> {
        let mut tables = self.tables.write().await;
        Ok(delete_all_permanent(&mut tables.transactions))
    }
}
