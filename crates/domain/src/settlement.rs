//! Pure settlement rules shared by the services.

use common::{Money, PaymentStatus};
use store::OrderItem;

use crate::error::{Result, ServiceError};

/// Sums `price * quantity` over the given line items. Returns `None` when
/// the total does not fit in a [`Money`].
pub fn order_total<'a>(items: impl IntoIterator<Item = &'a OrderItem>) -> Option<Money> {
    items
        .into_iter()
        .try_fold(Money::zero(), |total, item| total.checked_add(item.line_total()?))
}

/// Checks a tendered amount against the order total for the given status and
/// returns the change owed to the payer.
///
/// - `paid` requires `amount >= total`; change is `amount - total`
/// - `failed` requires `amount < total`; change is zero
/// - `pending` accepts any amount; change is zero
pub fn settle(status: PaymentStatus, amount: Money, total: Money) -> Result<Money> {
    match status {
        PaymentStatus::Paid if amount < total => {
            Err(ServiceError::InsufficientAmount { amount, total })
        }
        PaymentStatus::Paid => Ok(amount - total),
        PaymentStatus::Failed if amount >= total => {
            Err(ServiceError::InvalidFailedAmount { amount, total })
        }
        PaymentStatus::Failed | PaymentStatus::Pending => Ok(Money::zero()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{OrderId, OrderItemId, ProductId};

    fn item(id: i64, price: i64, quantity: u32) -> OrderItem {
        let now = Utc::now();
        OrderItem {
            id: OrderItemId::new(id),
            order_id: OrderId::new(1),
            product_id: ProductId::new(id),
            quantity,
            price: Money::new(price),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn total_sums_price_times_quantity() {
        let items = vec![item(1, 1000, 2), item(2, 500, 1)];
        assert_eq!(order_total(&items), Some(Money::new(2500)));
    }

    #[test]
    fn total_of_no_items_is_zero() {
        assert_eq!(order_total(std::iter::empty()), Some(Money::zero()));
    }

    #[test]
    fn total_out_of_range_is_none() {
        let items = vec![item(1, i64::MAX, 1), item(2, 1, 1)];
        assert_eq!(order_total(&items), None);
        assert_eq!(order_total(&[item(3, 5_000_000_000, u32::MAX)]), None);
    }

    #[test]
    fn paid_returns_change() {
        let change = settle(PaymentStatus::Paid, Money::new(3000), Money::new(2500)).unwrap();
        assert_eq!(change, Money::new(500));
    }

    #[test]
    fn paid_with_exact_amount_has_no_change() {
        let change = settle(PaymentStatus::Paid, Money::new(2500), Money::new(2500)).unwrap();
        assert!(change.is_zero());
    }

    #[test]
    fn paid_below_total_is_insufficient() {
        let err = settle(PaymentStatus::Paid, Money::new(2499), Money::new(2500)).unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientAmount { .. }));
    }

    #[test]
    fn failed_must_not_cover_total() {
        for amount in [2500, 4000] {
            let err =
                settle(PaymentStatus::Failed, Money::new(amount), Money::new(2500)).unwrap_err();
            assert!(matches!(err, ServiceError::InvalidFailedAmount { .. }));
        }

        let change = settle(PaymentStatus::Failed, Money::new(100), Money::new(2500)).unwrap();
        assert!(change.is_zero());
    }

    #[test]
    fn failed_on_empty_order_is_always_rejected() {
        let err = settle(PaymentStatus::Failed, Money::zero(), Money::zero()).unwrap_err();
        assert_eq!(err.kind(), "invalid_failed_amount");
    }

    #[test]
    fn pending_accepts_any_amount() {
        for amount in [0, 100, 2500, 9000] {
            let change =
                settle(PaymentStatus::Pending, Money::new(amount), Money::new(2500)).unwrap();
            assert!(change.is_zero());
        }
    }
}
