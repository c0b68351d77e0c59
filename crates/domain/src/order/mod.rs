//! Order fulfillment: order creation, editing and lifecycle cascades.

mod commands;
mod service;

pub use commands::{CreateOrder, LineItem, OrderLine, UpdateOrder};
pub use service::{OrderDetails, OrderService};
