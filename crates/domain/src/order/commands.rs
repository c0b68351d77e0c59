//! Order requests.

use common::{CashierId, MerchantId, OrderId, OrderItemId, ProductId};
use serde::{Deserialize, Serialize};

/// A product and quantity to place on a new order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Request to create an order with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub merchant_id: MerchantId,
    pub cashier_id: CashierId,
    pub items: Vec<LineItem>,
}

impl CreateOrder {
    pub fn new(merchant_id: MerchantId, cashier_id: CashierId) -> Self {
        Self {
            merchant_id,
            cashier_id,
            items: Vec::new(),
        }
    }

    /// Appends a line to the request.
    pub fn with_item(mut self, product_id: ProductId, quantity: u32) -> Self {
        self.items.push(LineItem::new(product_id, quantity));
        self
    }
}

/// One line of an order edit.
///
/// Editing an existing line rewrites it in place and leaves product stock
/// untouched. A new line goes through the same stock gate and decrement as
/// order creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderLine {
    Existing {
        id: OrderItemId,
        product_id: ProductId,
        quantity: u32,
    },
    New {
        product_id: ProductId,
        quantity: u32,
    },
}

impl OrderLine {
    /// Builds a line from an optional line item id. A missing or
    /// non-positive id denotes a new line.
    pub fn from_item_id(id: Option<OrderItemId>, product_id: ProductId, quantity: u32) -> Self {
        match id {
            Some(id) if id.as_i64() > 0 => OrderLine::Existing {
                id,
                product_id,
                quantity,
            },
            _ => OrderLine::New {
                product_id,
                quantity,
            },
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            OrderLine::Existing { product_id, .. } | OrderLine::New { product_id, .. } => {
                *product_id
            }
        }
    }

    pub fn quantity(&self) -> u32 {
        match self {
            OrderLine::Existing { quantity, .. } | OrderLine::New { quantity, .. } => *quantity,
        }
    }
}

/// Request to edit the lines of an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrder {
    pub order_id: OrderId,
    pub items: Vec<OrderLine>,
}

impl UpdateOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            items: Vec::new(),
        }
    }

    pub fn with_existing(mut self, id: OrderItemId, product_id: ProductId, quantity: u32) -> Self {
        self.items.push(OrderLine::Existing {
            id,
            product_id,
            quantity,
        });
        self
    }

    pub fn with_new(mut self, product_id: ProductId, quantity: u32) -> Self {
        self.items.push(OrderLine::New {
            product_id,
            quantity,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_item_id_is_a_new_line() {
        let product = ProductId::new(4);

        for id in [None, Some(OrderItemId::new(0)), Some(OrderItemId::new(-3))] {
            let line = OrderLine::from_item_id(id, product, 2);
            assert_eq!(
                line,
                OrderLine::New {
                    product_id: product,
                    quantity: 2
                }
            );
        }

        let line = OrderLine::from_item_id(Some(OrderItemId::new(9)), product, 2);
        assert!(matches!(line, OrderLine::Existing { id, .. } if id == OrderItemId::new(9)));
        assert_eq!(line.product_id(), product);
        assert_eq!(line.quantity(), 2);
    }

    #[test]
    fn order_line_uses_tagged_json() {
        let line = OrderLine::Existing {
            id: OrderItemId::new(1),
            product_id: ProductId::new(2),
            quantity: 3,
        };
        let json = serde_json::to_value(line).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "existing", "id": 1, "product_id": 2, "quantity": 3})
        );
    }

    #[test]
    fn create_order_builder_keeps_line_order() {
        let cmd = CreateOrder::new(MerchantId::new(1), CashierId::new(1))
            .with_item(ProductId::new(2), 1)
            .with_item(ProductId::new(1), 5);
        assert_eq!(cmd.items[0].product_id, ProductId::new(2));
        assert_eq!(cmd.items[1].quantity, 5);
    }
}
