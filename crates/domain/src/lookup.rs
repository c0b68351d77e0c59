//! Existence checks shared by the services.

use common::{CashierId, MerchantId, OrderId, ProductId};
use store::{
    Cashier, CashierRepository, Merchant, MerchantRepository, Order, OrderRepository, Product,
    ProductRepository,
};

use crate::error::{Result, ServiceError};

pub(crate) async fn require_merchant<S>(store: &S, id: MerchantId) -> Result<Merchant>
where
    S: MerchantRepository + ?Sized,
{
    store
        .find_merchant(id)
        .await?
        .ok_or_else(|| ServiceError::not_found(Merchant::ENTITY, id))
}

pub(crate) async fn require_cashier<S>(store: &S, id: CashierId) -> Result<Cashier>
where
    S: CashierRepository + ?Sized,
{
    store
        .find_cashier(id)
        .await?
        .ok_or_else(|| ServiceError::not_found(Cashier::ENTITY, id))
}

pub(crate) async fn require_product<S>(store: &S, id: ProductId) -> Result<Product>
where
    S: ProductRepository + ?Sized,
{
    store
        .find_product(id)
        .await?
        .ok_or_else(|| ServiceError::not_found(Product::ENTITY, id))
}

pub(crate) async fn require_order<S>(store: &S, id: OrderId) -> Result<Order>
where
    S: OrderRepository + ?Sized,
{
    store
        .find_order(id)
        .await?
        .ok_or_else(|| ServiceError::not_found(Order::ENTITY, id))
}
