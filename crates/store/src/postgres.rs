use async_trait::async_trait;
use common::{
    CashierId, MerchantId, Money, OrderId, OrderItemId, PaymentStatus, ProductId, TransactionId,
};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::models::{
    Cashier, Merchant, NewOrder, NewOrderItem, NewTransaction, Order, OrderItem, OrderItemUpdate,
    Product, Transaction, TransactionUpdate,
};
use crate::repository::{
    CashierRepository, MerchantRepository, OrderItemRepository, OrderRepository,
    ProductRepository, TransactionRepository,
};
use crate::{Result, StoreError};

const MERCHANT_COLUMNS: &str = "merchant_id, name, created_at, updated_at, deleted_at";
const CASHIER_COLUMNS: &str = "cashier_id, merchant_id, name, created_at, updated_at, deleted_at";
const PRODUCT_COLUMNS: &str =
    "product_id, merchant_id, name, price, count_in_stock, created_at, updated_at, deleted_at";
const ORDER_COLUMNS: &str =
    "order_id, merchant_id, cashier_id, total_price, created_at, updated_at, deleted_at";
const ORDER_ITEM_COLUMNS: &str =
    "order_item_id, order_id, product_id, quantity, price, created_at, updated_at, deleted_at";
const TRANSACTION_COLUMNS: &str = "transaction_id, order_id, merchant_id, payment_method, amount, \
     change_amount, payment_status, created_at, updated_at, deleted_at";

/// PostgreSQL-backed store implementation.
///
/// Each repository call runs as a single statement, so each call is its
/// own commit point.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    fn row_to_merchant(row: PgRow) -> Result<Merchant> {
        Ok(Merchant {
            id: MerchantId::new(row.try_get("merchant_id")?),
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }

    fn row_to_cashier(row: PgRow) -> Result<Cashier> {
        Ok(Cashier {
            id: CashierId::new(row.try_get("cashier_id")?),
            merchant_id: MerchantId::new(row.try_get("merchant_id")?),
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("product_id")?),
            merchant_id: MerchantId::new(row.try_get("merchant_id")?),
            name: row.try_get("name")?,
            price: Money::new(row.try_get("price")?),
            count_in_stock: to_u32("count_in_stock", row.try_get("count_in_stock")?)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::new(row.try_get("order_id")?),
            merchant_id: MerchantId::new(row.try_get("merchant_id")?),
            cashier_id: CashierId::new(row.try_get("cashier_id")?),
            total_price: Money::new(row.try_get("total_price")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }

    fn row_to_order_item(row: PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            id: OrderItemId::new(row.try_get("order_item_id")?),
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: to_u32("quantity", row.try_get("quantity")?)?,
            price: Money::new(row.try_get("price")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }

    fn row_to_transaction(row: PgRow) -> Result<Transaction> {
        let status: String = row.try_get("payment_status")?;
        Ok(Transaction {
            id: TransactionId::new(row.try_get("transaction_id")?),
            order_id: OrderId::new(row.try_get("order_id")?),
            merchant_id: MerchantId::new(row.try_get("merchant_id")?),
            payment_method: row.try_get("payment_method")?,
            amount: Money::new(row.try_get("amount")?),
            change_amount: Money::new(row.try_get("change_amount")?),
            payment_status: status.parse::<PaymentStatus>()?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned())
}

/// Maps the `transactions.order_id` foreign key violation to
/// [`StoreError::Referenced`].
fn order_delete_error(err: sqlx::Error) -> StoreError {
    let referenced = err
        .as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation());
    if referenced {
        StoreError::Referenced {
            entity: Order::ENTITY,
            referrer: Transaction::ENTITY,
        }
    } else {
        err.into()
    }
}

fn to_u32(column: &'static str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::InvalidColumn {
        column,
        value: value.into(),
    })
}

fn to_i32(column: &'static str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::InvalidColumn {
        column,
        value: value.into(),
    })
}

#[async_trait]
impl MerchantRepository for PostgresStore {
    async fn find_merchant(&self, id: MerchantId) -> Result<Option<Merchant>> {
        let row = sqlx::query(&format!(
            "SELECT {MERCHANT_COLUMNS} FROM merchants WHERE merchant_id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_merchant).transpose()
    }
}

#[async_trait]
impl CashierRepository for PostgresStore {
    async fn find_cashier(&self, id: CashierId) -> Result<Option<Cashier>> {
        let row = sqlx::query(&format!(
            "SELECT {CASHIER_COLUMNS} FROM cashiers WHERE cashier_id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_cashier).transpose()
    }
}

#[async_trait]
impl ProductRepository for PostgresStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn update_stock(&self, id: ProductId, count_in_stock: u32) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products SET count_in_stock = $2, updated_at = NOW()
            WHERE product_id = $1 AND deleted_at IS NULL
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(to_i32("count_in_stock", count_in_stock)?)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(Product::ENTITY, id))?;

        Self::row_to_product(row)
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<Option<Product>> {
        // Zero rows means the product is gone or short of stock.
        let row = sqlx::query(&format!(
            r#"
            UPDATE products SET count_in_stock = count_in_stock - $2, updated_at = NOW()
            WHERE product_id = $1 AND deleted_at IS NULL AND count_in_stock >= $2
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(to_i32("quantity", quantity)?)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (merchant_id, cashier_id, total_price)
            VALUES ($1, $2, $3)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.merchant_id.as_i64())
        .bind(order.cashier_id.as_i64())
        .bind(order.total_price.amount())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_order(row)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_trashed_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1 AND deleted_at IS NOT NULL"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_orders_by_merchant(&self, merchant_id: MerchantId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE merchant_id = $1 AND deleted_at IS NULL
            ORDER BY order_id DESC
            "#
        ))
        .bind(merchant_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn find_trashed_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE deleted_at IS NOT NULL ORDER BY order_id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn update_order_total(&self, id: OrderId, total_price: Money) -> Result<Order> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET total_price = $2, updated_at = NOW()
            WHERE order_id = $1 AND deleted_at IS NULL
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(total_price.amount())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(Order::ENTITY, id))?;

        Self::row_to_order(row)
    }

    async fn trash_order(&self, id: OrderId) -> Result<Order> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET deleted_at = NOW()
            WHERE order_id = $1 AND deleted_at IS NULL
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(Order::ENTITY, id))?;

        Self::row_to_order(row)
    }

    async fn restore_order(&self, id: OrderId) -> Result<Order> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET deleted_at = NULL
            WHERE order_id = $1 AND deleted_at IS NOT NULL
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(Order::ENTITY, id))?;

        Self::row_to_order(row)
    }

    async fn delete_order_permanent(&self, id: OrderId) -> Result<()> {
        let result =
            sqlx::query("DELETE FROM orders WHERE order_id = $1 AND deleted_at IS NOT NULL")
                .bind(id.as_i64())
                .execute(&self.pool)
                .await
                .map_err(order_delete_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(Order::ENTITY, id));
        }
        Ok(())
    }

    async fn restore_all_orders(&self) -> Result<u64> {
        let result =
            sqlx::query("UPDATE orders SET deleted_at = NULL WHERE deleted_at IS NOT NULL")
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn delete_all_orders_permanent(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM orders WHERE deleted_at IS NOT NULL")
            .execute(&self.pool)
            .await
            .map_err(order_delete_error)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OrderItemRepository for PostgresStore {
    async fn create_order_item(&self, item: NewOrderItem) -> Result<OrderItem> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            RETURNING {ORDER_ITEM_COLUMNS}
            "#
        ))
        .bind(item.order_id.as_i64())
        .bind(item.product_id.as_i64())
        .bind(to_i32("quantity", item.quantity)?)
        .bind(item.price.amount())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_order_item(row)
    }

    async fn update_order_item(&self, update: OrderItemUpdate) -> Result<OrderItem> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE order_items SET product_id = $2, quantity = $3, price = $4, updated_at = NOW()
            WHERE order_item_id = $1 AND deleted_at IS NULL
            RETURNING {ORDER_ITEM_COLUMNS}
            "#
        ))
        .bind(update.id.as_i64())
        .bind(update.product_id.as_i64())
        .bind(to_i32("quantity", update.quantity)?)
        .bind(update.price.amount())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(OrderItem::ENTITY, update.id))?;

        Self::row_to_order_item(row)
    }

    async fn find_order_item(&self, id: OrderItemId) -> Result<Option<OrderItem>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {ORDER_ITEM_COLUMNS} FROM order_items
            WHERE order_item_id = $1 AND deleted_at IS NULL
            "#
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order_item).transpose()
    }

    async fn find_order_items_by_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_ITEM_COLUMNS} FROM order_items
            WHERE order_id = $1 AND deleted_at IS NULL
            ORDER BY order_item_id ASC
            "#
        ))
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order_item).collect()
    }

    async fn find_trashed_order_items_by_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_ITEM_COLUMNS} FROM order_items
            WHERE order_id = $1 AND deleted_at IS NOT NULL
            ORDER BY order_item_id ASC
            "#
        ))
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order_item).collect()
    }

    async fn total_price_by_order(&self, order_id: OrderId) -> Result<Money> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(price * quantity), 0)::BIGINT
            FROM order_items
            WHERE order_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if sqlstate(&e).as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) {
                StoreError::AmountOverflow { order_id }
            } else {
                e.into()
            }
        })?;

        Ok(Money::new(total))
    }

    async fn trash_order_item(&self, id: OrderItemId) -> Result<OrderItem> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE order_items SET deleted_at = NOW()
            WHERE order_item_id = $1 AND deleted_at IS NULL
            RETURNING {ORDER_ITEM_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(OrderItem::ENTITY, id))?;

        Self::row_to_order_item(row)
    }

    async fn restore_order_item(&self, id: OrderItemId) -> Result<OrderItem> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE order_items SET deleted_at = NULL
            WHERE order_item_id = $1 AND deleted_at IS NOT NULL
            RETURNING {ORDER_ITEM_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(OrderItem::ENTITY, id))?;

        Self::row_to_order_item(row)
    }

    async fn delete_order_item_permanent(&self, id: OrderItemId) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM order_items WHERE order_item_id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(OrderItem::ENTITY, id));
        }
        Ok(())
    }

    async fn restore_all_order_items(&self) -> Result<u64> {
        let result =
            sqlx::query("UPDATE order_items SET deleted_at = NULL WHERE deleted_at IS NOT NULL")
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn delete_all_order_items_permanent(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM order_items WHERE deleted_at IS NOT NULL")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TransactionRepository for PostgresStore {
    async fn create_transaction(&self, transaction: NewTransaction) -> Result<Transaction> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO transactions
                (order_id, merchant_id, payment_method, amount, change_amount, payment_status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(transaction.order_id.as_i64())
        .bind(transaction.merchant_id.as_i64())
        .bind(&transaction.payment_method)
        .bind(transaction.amount.amount())
        .bind(transaction.change_amount.amount())
        .bind(transaction.payment_status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_transaction(row)
    }

    async fn update_transaction(&self, update: TransactionUpdate) -> Result<Transaction> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE transactions SET
                order_id = $2, merchant_id = $3, payment_method = $4, amount = $5,
                change_amount = $6, payment_status = $7, updated_at = NOW()
            WHERE transaction_id = $1 AND deleted_at IS NULL
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(update.id.as_i64())
        .bind(update.order_id.as_i64())
        .bind(update.merchant_id.as_i64())
        .bind(&update.payment_method)
        .bind(update.amount.amount())
        .bind(update.change_amount.amount())
        .bind(update.payment_status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(Transaction::ENTITY, update.id))?;

        Self::row_to_transaction(row)
    }

    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE transaction_id = $1 AND deleted_at IS NULL
            "#
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_transaction).transpose()
    }

    async fn find_transactions_by_order(&self, order_id: OrderId) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE order_id = $1 AND deleted_at IS NULL
            ORDER BY transaction_id ASC
            "#
        ))
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_transaction).collect()
    }

    async fn find_transactions_by_merchant(
        &self,
        merchant_id: MerchantId,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE merchant_id = $1 AND deleted_at IS NULL
            ORDER BY transaction_id DESC
            "#
        ))
        .bind(merchant_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_transaction).collect()
    }

    async fn trash_transaction(&self, id: TransactionId) -> Result<Transaction> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE transactions SET deleted_at = NOW()
            WHERE transaction_id = $1 AND deleted_at IS NULL
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(Transaction::ENTITY, id))?;

        Self::row_to_transaction(row)
    }

    async fn restore_transaction(&self, id: TransactionId) -> Result<Transaction> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE transactions SET deleted_at = NULL
            WHERE transaction_id = $1 AND deleted_at IS NOT NULL
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(Transaction::ENTITY, id))?;

        Self::row_to_transaction(row)
    }

    async fn delete_transaction_permanent(&self, id: TransactionId) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM transactions WHERE transaction_id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(Transaction::ENTITY, id));
        }
        Ok(())
    }

    async fn restore_all_transactions(&self) -> Result<u64> {
        let result =
            sqlx::query("UPDATE transactions SET deleted_at = NULL WHERE deleted_at IS NOT NULL")
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn delete_all_transactions_permanent(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM transactions WHERE deleted_at IS NOT NULL")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
