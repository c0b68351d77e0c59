//! Payment settlement: recording transactions against an order total.

mod commands;
mod service;

pub use commands::{CreateTransaction, UpdateTransaction};
pub use service::TransactionService;
