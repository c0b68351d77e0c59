//! Route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod transactions;

use serde::Serialize;

/// Body returned by operations that report success without a record.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}
