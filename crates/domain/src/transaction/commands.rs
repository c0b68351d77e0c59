//! Transaction requests.

use common::{MerchantId, Money, OrderId, TransactionId};
use serde::{Deserialize, Serialize};

/// Request to record a payment against an order.
///
/// `payment_status` is validated by the service and must be one of
/// `pending`, `paid` or `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransaction {
    pub order_id: OrderId,
    pub merchant_id: MerchantId,
    pub payment_method: String,
    pub amount: Money,
    pub payment_status: String,
}

impl CreateTransaction {
    pub fn new(
        order_id: OrderId,
        merchant_id: MerchantId,
        payment_method: impl Into<String>,
        amount: Money,
        payment_status: impl Into<String>,
    ) -> Self {
        Self {
            order_id,
            merchant_id,
            payment_method: payment_method.into(),
            amount,
            payment_status: payment_status.into(),
        }
    }
}

/// Request to rewrite a recorded payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTransaction {
    pub transaction_id: TransactionId,
    pub order_id: OrderId,
    pub merchant_id: MerchantId,
    pub payment_method: String,
    pub amount: Money,
    pub payment_status: String,
}

impl UpdateTransaction {
    pub fn new(transaction_id: TransactionId, payment: CreateTransaction) -> Self {
        Self {
            transaction_id,
            order_id: payment.order_id,
            merchant_id: payment.merchant_id,
            payment_method: payment.payment_method,
            amount: payment.amount,
            payment_status: payment.payment_status,
        }
    }
}
