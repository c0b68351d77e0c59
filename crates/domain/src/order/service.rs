//! Order fulfillment service.

use std::time::Instant;

use common::{MerchantId, Money, OrderId, OrderItemId, ProductId};
use serde::{Deserialize, Serialize};
use store::{NewOrder, NewOrderItem, Order, OrderItem, OrderItemUpdate, PosStore, StoreError};

use crate::error::{Result, ServiceError, Transition};
use crate::lookup;

use super::{CreateOrder, OrderLine, UpdateOrder};

/// A live order together with its live line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Service for creating, editing and retiring orders.
///
/// Every store call is its own commit point. A failure part way through an
/// operation leaves the earlier steps applied and is returned to the caller
/// without retry.
pub struct OrderService<S: PosStore> {
    store: S,
}

impl<S: PosStore> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an order and places each requested line in the given order.
    ///
    /// Each line must reference an existing product with at least one unit
    /// in stock. The product's current price is captured on the line and its
    /// stock is decremented by the line quantity. Lines placed before a
    /// failing line stay committed.
    ///
    /// Returns the order as it was created. Its `total_price` is written
    /// afterwards, so callers that need the total must read the order back.
    #[tracing::instrument(
        skip(self, cmd),
        fields(
            merchant_id = %cmd.merchant_id,
            cashier_id = %cmd.cashier_id,
            lines = cmd.items.len()
        )
    )]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order> {
        let started = Instant::now();

        lookup::require_merchant(&self.store, cmd.merchant_id).await?;
        lookup::require_cashier(&self.store, cmd.cashier_id).await?;

        for line in &cmd.items {
            validate_quantity(line.product_id, line.quantity)?;
        }

        let order = self
            .store
            .create_order(NewOrder {
                merchant_id: cmd.merchant_id,
                cashier_id: cmd.cashier_id,
                total_price: Money::zero(),
            })
            .await?;
        metrics::counter!("orders_created_total").increment(1);

        for line in &cmd.items {
            self.place_new_line(order.id, line.product_id, line.quantity)
                .await?;
        }

        let total = self.recompute_total(order.id).await?;

        metrics::histogram!("order_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(order_id = %order.id, total = %total, "order created");

        Ok(order)
    }

    /// Edits the lines of a live order.
    ///
    /// Existing lines are rewritten in place with the product's current
    /// price and leave stock untouched, whatever the quantity change. New
    /// lines are placed exactly as in [`create_order`](Self::create_order).
    ///
    /// Returns the order as it was before the edit.
    #[tracing::instrument(
        skip(self, cmd),
        fields(order_id = %cmd.order_id, lines = cmd.items.len())
    )]
    pub async fn update_order(&self, cmd: UpdateOrder) -> Result<Order> {
        let order = lookup::require_order(&self.store, cmd.order_id).await?;

        for line in &cmd.items {
            validate_quantity(line.product_id(), line.quantity())?;
        }

        for line in &cmd.items {
            match *line {
                OrderLine::Existing {
                    id,
                    product_id,
                    quantity,
                } => {
                    self.rewrite_line(order.id, id, product_id, quantity)
                        .await?;
                }
                OrderLine::New {
                    product_id,
                    quantity,
                } => {
                    self.place_new_line(order.id, product_id, quantity).await?;
                }
            }
        }

        let total = self.recompute_total(order.id).await?;
        tracing::info!(total = %total, "order updated");

        Ok(order)
    }

    /// Loads a live order with its live line items.
    #[tracing::instrument(skip(self))]
    pub async fn find_order(&self, order_id: OrderId) -> Result<OrderDetails> {
        let order = lookup::require_order(&self.store, order_id).await?;
        let items = self.store.find_order_items_by_order(order_id).await?;
        Ok(OrderDetails { order, items })
    }

    /// Lists the live orders of a merchant, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders_by_merchant(&self, merchant_id: MerchantId) -> Result<Vec<Order>> {
        lookup::require_merchant(&self.store, merchant_id).await?;
        Ok(self.store.find_orders_by_merchant(merchant_id).await?)
    }

    /// Lists trashed orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_trashed_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.find_trashed_orders().await?)
    }

    /// Trashes the live line items of an order, then the order.
    #[tracing::instrument(skip(self))]
    pub async fn trash_order(&self, order_id: OrderId) -> Result<Order> {
        lookup::require_order(&self.store, order_id).await?;

        let items = self.store.find_order_items_by_order(order_id).await?;
        for item in &items {
            self.store.trash_order_item(item.id).await?;
        }

        let order = self
            .store
            .trash_order(order_id)
            .await
            .map_err(|e| cascade_failed(order_id, Transition::Trash, items.len(), e))?;

        tracing::info!(items = items.len(), "order trashed");
        Ok(order)
    }

    /// Restores the trashed line items of a trashed order, then the order.
    #[tracing::instrument(skip(self))]
    pub async fn restore_order(&self, order_id: OrderId) -> Result<Order> {
        self.require_trashed_order(order_id).await?;

        let items = self.store.find_trashed_order_items_by_order(order_id).await?;
        for item in &items {
            self.store.restore_order_item(item.id).await?;
        }

        let order = self
            .store
            .restore_order(order_id)
            .await
            .map_err(|e| cascade_failed(order_id, Transition::Restore, items.len(), e))?;

        tracing::info!(items = items.len(), "order restored");
        Ok(order)
    }

    /// Permanently deletes the trashed line items of a trashed order, then
    /// the order.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order_permanent(&self, order_id: OrderId) -> Result<bool> {
        self.require_trashed_order(order_id).await?;

        let items = self.store.find_trashed_order_items_by_order(order_id).await?;
        for item in &items {
            self.store.delete_order_item_permanent(item.id).await?;
        }

        self.store
            .delete_order_permanent(order_id)
            .await
            .map_err(|e| cascade_failed(order_id, Transition::DeletePermanent, items.len(), e))?;

        tracing::info!(items = items.len(), "order permanently deleted");
        Ok(true)
    }

    /// Restores every trashed line item, then every trashed order.
    #[tracing::instrument(skip(self))]
    pub async fn restore_all_orders(&self) -> Result<bool> {
        let items = self.store.restore_all_order_items().await?;
        let orders = self
            .store
            .restore_all_orders()
            .await
            .map_err(|e| bulk_cascade_failed(Transition::Restore, items, e))?;

        tracing::info!(items, orders, "all trashed orders restored");
        Ok(true)
    }

    /// Permanently deletes every trashed line item, then every trashed order.
    #[tracing::instrument(skip(self))]
    pub async fn delete_all_orders_permanent(&self) -> Result<bool> {
        let items = self.store.delete_all_order_items_permanent().await?;
        let orders = self
            .store
            .delete_all_orders_permanent()
            .await
            .map_err(|e| bulk_cascade_failed(Transition::DeletePermanent, items, e))?;

        tracing::info!(items, orders, "all trashed orders permanently deleted");
        Ok(true)
    }

    async fn require_trashed_order(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .find_trashed_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Order::ENTITY, order_id))
    }

    /// Gates on stock, takes the units and writes a new line.
    ///
    /// Stock is taken before the line is written so that a line is never
    /// recorded without its units. The cost is the opposite window: if the
    /// line write fails, the units stay taken with no line to show for them.
    async fn place_new_line(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<OrderItem> {
        let product = lookup::require_product(&self.store, product_id).await?;
        check_line_total(order_id, product.price, quantity)?;

        if product.count_in_stock < 1 {
            tracing::warn!(%product_id, "product out of stock");
            return Err(ServiceError::OutOfStock { product_id });
        }

        if self
            .store
            .decrement_stock(product_id, quantity)
            .await?
            .is_none()
        {
            tracing::warn!(
                %product_id,
                quantity,
                available = product.count_in_stock,
                "not enough stock for line"
            );
            return Err(ServiceError::OutOfStock { product_id });
        }

        let item = self
            .store
            .create_order_item(NewOrderItem {
                order_id,
                product_id,
                quantity,
                price: product.price,
            })
            .await?;
        metrics::counter!("order_items_created_total").increment(1);

        Ok(item)
    }

    /// Rewrites a live line of this order with the product's current price.
    async fn rewrite_line(
        &self,
        order_id: OrderId,
        id: OrderItemId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<OrderItem> {
        let item = self
            .store
            .find_order_item(id)
            .await?
            .filter(|item| item.order_id == order_id)
            .ok_or_else(|| ServiceError::not_found(OrderItem::ENTITY, id))?;
        let product = lookup::require_product(&self.store, product_id).await?;
        check_line_total(order_id, product.price, quantity)?;

        Ok(self
            .store
            .update_order_item(OrderItemUpdate {
                id: item.id,
                product_id,
                quantity,
                price: product.price,
            })
            .await?)
    }

    /// Writes the sum of the live lines back onto the order.
    async fn recompute_total(&self, order_id: OrderId) -> Result<Money> {
        let total = self.store.total_price_by_order(order_id).await?;
        self.store.update_order_total(order_id, total).await?;
        Ok(total)
    }
}

fn validate_quantity(product_id: ProductId, quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(ServiceError::InvalidQuantity {
            product_id,
            quantity,
        });
    }
    Ok(())
}

fn check_line_total(order_id: OrderId, price: Money, quantity: u32) -> Result<()> {
    if price.checked_multiply(quantity).is_none() {
        tracing::warn!(%order_id, %price, quantity, "line total out of range");
        return Err(ServiceError::AmountOverflow { order_id });
    }
    Ok(())
}

fn cascade_failed(
    order_id: OrderId,
    transition: Transition,
    children: usize,
    source: StoreError,
) -> ServiceError {
    if children == 0 {
        return source.into();
    }
    tracing::error!(%order_id, %transition, children, error = %source, "order cascade incomplete");
    ServiceError::CascadeIncomplete {
        order_id,
        transition,
        source,
    }
}

fn bulk_cascade_failed(transition: Transition, children: u64, source: StoreError) -> ServiceError {
    if children == 0 {
        return source.into();
    }
    tracing::error!(%transition, children, error = %source, "bulk order cascade incomplete");
    ServiceError::BulkCascadeIncomplete { transition, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryStore;
    use store::memory::FailPoint;

    struct Fixture {
        service: OrderService<InMemoryStore>,
        merchant_id: MerchantId,
        cashier_id: common::CashierId,
        coffee: ProductId,
        tea: ProductId,
        sold_out: ProductId,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let merchant = store.insert_merchant("Corner Shop").await;
        let cashier = store.insert_cashier(merchant.id, "Alice").await;
        let coffee = store
            .insert_product(merchant.id, "Coffee", Money::new(1000), 10)
            .await;
        let tea = store
            .insert_product(merchant.id, "Tea", Money::new(500), 5)
            .await;
        let sold_out = store
            .insert_product(merchant.id, "Cake", Money::new(700), 0)
            .await;

        Fixture {
            service: OrderService::new(store),
            merchant_id: merchant.id,
            cashier_id: cashier.id,
            coffee: coffee.id,
            tea: tea.id,
            sold_out: sold_out.id,
        }
    }

    async fn stock(service: &OrderService<InMemoryStore>, id: ProductId) -> u32 {
        use store::ProductRepository;
        service
            .store()
            .find_product(id)
            .await
            .unwrap()
            .unwrap()
            .count_in_stock
    }

    #[tokio::test]
    async fn create_order_returns_shell_and_writes_total() {
        let f = fixture().await;

        let order = f
            .service
            .create_order(
                CreateOrder::new(f.merchant_id, f.cashier_id)
                    .with_item(f.coffee, 2)
                    .with_item(f.tea, 1),
            )
            .await
            .unwrap();
        assert_eq!(order.total_price, Money::zero());

        let details = f.service.find_order(order.id).await.unwrap();
        assert_eq!(details.order.total_price, Money::new(2500));
        assert_eq!(details.items.len(), 2);
        assert_eq!(stock(&f.service, f.coffee).await, 8);
        assert_eq!(stock(&f.service, f.tea).await, 4);
    }

    #[tokio::test]
    async fn create_order_requires_merchant_and_cashier() {
        let f = fixture().await;

        let err = f
            .service
            .create_order(CreateOrder::new(MerchantId::new(99), f.cashier_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "merchant", id: 99 }));

        let err = f
            .service
            .create_order(CreateOrder::new(f.merchant_id, common::CashierId::new(42)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "cashier", id: 42 }));
        assert_eq!(f.service.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected_before_any_write() {
        let f = fixture().await;

        let err = f
            .service
            .create_order(
                CreateOrder::new(f.merchant_id, f.cashier_id)
                    .with_item(f.coffee, 1)
                    .with_item(f.tea, 0),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidQuantity { quantity: 0, .. }));
        assert_eq!(f.service.store().order_count().await, 0);
        assert_eq!(stock(&f.service, f.coffee).await, 10);
    }

    #[tokio::test]
    async fn missing_merchant_wins_over_zero_quantity() {
        let f = fixture().await;

        let err = f
            .service
            .create_order(CreateOrder::new(MerchantId::new(99), f.cashier_id).with_item(f.tea, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "merchant", id: 99 }));
    }

    #[tokio::test]
    async fn sold_out_product_stops_at_the_failing_line() {
        let f = fixture().await;

        let err = f
            .service
            .create_order(
                CreateOrder::new(f.merchant_id, f.cashier_id)
                    .with_item(f.coffee, 1)
                    .with_item(f.sold_out, 1)
                    .with_item(f.tea, 1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::OutOfStock { product_id } if product_id == f.sold_out));

        // Earlier line stays committed, later line is never placed.
        assert_eq!(f.service.store().order_item_count().await, 1);
        assert_eq!(stock(&f.service, f.coffee).await, 9);
        assert_eq!(stock(&f.service, f.tea).await, 5);
    }

    #[tokio::test]
    async fn quantity_above_stock_is_out_of_stock() {
        let f = fixture().await;

        let err = f
            .service
            .create_order(CreateOrder::new(f.merchant_id, f.cashier_id).with_item(f.tea, 6))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "out_of_stock");
        assert_eq!(stock(&f.service, f.tea).await, 5);
        assert_eq!(f.service.store().order_item_count().await, 0);
    }

    #[tokio::test]
    async fn update_order_edits_in_place_without_touching_stock() {
        let f = fixture().await;
        let order = f
            .service
            .create_order(CreateOrder::new(f.merchant_id, f.cashier_id).with_item(f.coffee, 2))
            .await
            .unwrap();
        let line = f.service.find_order(order.id).await.unwrap().items[0].clone();

        f.service
            .update_order(
                UpdateOrder::new(order.id)
                    .with_existing(line.id, f.coffee, 5)
                    .with_new(f.tea, 2),
            )
            .await
            .unwrap();

        let details = f.service.find_order(order.id).await.unwrap();
        assert_eq!(details.items[0].quantity, 5);
        assert_eq!(details.order.total_price, Money::new(6000));
        assert_eq!(stock(&f.service, f.coffee).await, 8);
        assert_eq!(stock(&f.service, f.tea).await, 3);
    }

    #[tokio::test]
    async fn oversized_line_total_is_rejected_before_writing() {
        let f = fixture().await;
        let pricey = f
            .service
            .store()
            .insert_product(f.merchant_id, "Gold bar", Money::new(5_000_000_000), 1)
            .await;
        let order = f
            .service
            .create_order(CreateOrder::new(f.merchant_id, f.cashier_id).with_item(pricey.id, 1))
            .await
            .unwrap();
        let line = f.service.find_order(order.id).await.unwrap().items[0].clone();

        let err = f
            .service
            .update_order(UpdateOrder::new(order.id).with_existing(line.id, pricey.id, u32::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AmountOverflow { order_id } if order_id == order.id));

        let details = f.service.find_order(order.id).await.unwrap();
        assert_eq!(details.items[0].quantity, 1);
        assert_eq!(details.order.total_price, Money::new(5_000_000_000));
    }

    #[tokio::test]
    async fn update_order_rejects_lines_of_other_orders() {
        let f = fixture().await;
        let first = f
            .service
            .create_order(CreateOrder::new(f.merchant_id, f.cashier_id).with_item(f.coffee, 1))
            .await
            .unwrap();
        let second = f
            .service
            .create_order(CreateOrder::new(f.merchant_id, f.cashier_id))
            .await
            .unwrap();
        let foreign = f.service.find_order(first.id).await.unwrap().items[0].id;

        let err = f
            .service
            .update_order(UpdateOrder::new(second.id).with_existing(foreign, f.coffee, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "order item", .. }));
    }

    #[tokio::test]
    async fn trash_cascade_reports_parent_failure() {
        let f = fixture().await;
        let order = f
            .service
            .create_order(CreateOrder::new(f.merchant_id, f.cashier_id).with_item(f.coffee, 1))
            .await
            .unwrap();

        f.service
            .store()
            .set_fail_point(FailPoint::OrderLifecycle, true)
            .await;
        let err = f.service.trash_order(order.id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::CascadeIncomplete {
                transition: Transition::Trash,
                ..
            }
        ));

        // Line items were trashed, the order was not.
        let details = f.service.find_order(order.id).await.unwrap();
        assert!(details.items.is_empty());
    }

    #[tokio::test]
    async fn child_failure_leaves_order_untouched() {
        let f = fixture().await;
        let order = f
            .service
            .create_order(CreateOrder::new(f.merchant_id, f.cashier_id).with_item(f.coffee, 1))
            .await
            .unwrap();

        f.service
            .store()
            .set_fail_point(FailPoint::OrderItemLifecycle, true)
            .await;
        let err = f.service.trash_order(order.id).await.unwrap_err();
        assert_eq!(err.kind(), "storage_failure");

        let details = f.service.find_order(order.id).await.unwrap();
        assert_eq!(details.items.len(), 1);
    }

    #[tokio::test]
    async fn parent_failure_without_children_is_a_plain_error() {
        let f = fixture().await;
        let order = f
            .service
            .create_order(CreateOrder::new(f.merchant_id, f.cashier_id))
            .await
            .unwrap();

        f.service
            .store()
            .set_fail_point(FailPoint::OrderLifecycle, true)
            .await;
        let err = f.service.trash_order(order.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
    }

    #[tokio::test]
    async fn lifecycle_requires_matching_state() {
        let f = fixture().await;
        let order = f
            .service
            .create_order(CreateOrder::new(f.merchant_id, f.cashier_id))
            .await
            .unwrap();

        assert!(matches!(
            f.service.restore_order(order.id).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
        assert!(matches!(
            f.service.delete_order_permanent(order.id).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));

        f.service.trash_order(order.id).await.unwrap();
        assert!(matches!(
            f.service.trash_order(order.id).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
        assert!(f.service.delete_order_permanent(order.id).await.unwrap());
        assert_eq!(f.service.store().order_count().await, 0);
    }
}
