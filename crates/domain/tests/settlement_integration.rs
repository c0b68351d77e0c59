//! Integration tests for payment settlement.
//!
//! Orders are built through the order service so that settlement always
//! sees line items written the same way production does.

use domain::{
    CreateOrder, CreateTransaction, OrderService, ServiceError, TransactionService, UpdateOrder,
    UpdateTransaction,
};
use store::{
    InMemoryStore, MerchantId, Money, OrderId, OrderItemRepository, OrderRepository,
    PaymentStatus, ProductId, TransactionRepository,
};

struct Till {
    orders: OrderService<InMemoryStore>,
    payments: TransactionService<InMemoryStore>,
    merchant_id: MerchantId,
    order_id: OrderId,
    tea: ProductId,
}

/// One order totalling 2500.
async fn till() -> Till {
    let store = InMemoryStore::new();
    let merchant = store.insert_merchant("Corner Shop").await;
    let cashier = store.insert_cashier(merchant.id, "Alice").await;
    let coffee = store
        .insert_product(merchant.id, "Coffee", Money::new(1000), 20)
        .await;
    let tea = store
        .insert_product(merchant.id, "Tea", Money::new(500), 20)
        .await;

    let orders = OrderService::new(store.clone());
    let order = orders
        .create_order(
            CreateOrder::new(merchant.id, cashier.id)
                .with_item(coffee.id, 2)
                .with_item(tea.id, 1),
        )
        .await
        .unwrap();

    Till {
        orders,
        payments: TransactionService::new(store),
        merchant_id: merchant.id,
        order_id: order.id,
        tea: tea.id,
    }
}

impl Till {
    fn pay(&self, amount: i64, status: &str) -> CreateTransaction {
        CreateTransaction::new(
            self.order_id,
            self.merchant_id,
            "cash",
            Money::new(amount),
            status,
        )
    }

    async fn recorded(&self) -> usize {
        self.payments.store().transaction_count().await
    }
}

mod paid {
    use super::*;

    #[tokio::test]
    async fn change_is_amount_minus_total() {
        let till = till().await;

        let tx = till
            .payments
            .create_transaction(till.pay(3000, "paid"))
            .await
            .unwrap();
        assert_eq!(tx.change_amount, Money::new(500));
        assert_eq!(tx.payment_status, PaymentStatus::Paid);
        assert_eq!(tx.payment_status.as_str(), "paid");
    }

    #[tokio::test]
    async fn exact_amount_leaves_no_change() {
        let till = till().await;

        let tx = till
            .payments
            .create_transaction(till.pay(2500, "paid"))
            .await
            .unwrap();
        assert_eq!(tx.change_amount, Money::zero());
    }

    #[tokio::test]
    async fn short_amount_is_insufficient_and_persists_nothing() {
        let till = till().await;

        for amount in [0, 1, 2499] {
            let err = till
                .payments
                .create_transaction(till.pay(amount, "paid"))
                .await
                .unwrap_err();
            match err {
                ServiceError::InsufficientAmount { amount: a, total } => {
                    assert_eq!(a, Money::new(amount));
                    assert_eq!(total, Money::new(2500));
                }
                other => panic!("expected InsufficientAmount, got {other:?}"),
            }
        }
        assert_eq!(till.recorded().await, 0);
    }
}

mod failed {
    use super::*;

    #[tokio::test]
    async fn amount_covering_total_is_rejected() {
        let till = till().await;

        for amount in [2500, 2501, 10_000] {
            let err = till
                .payments
                .create_transaction(till.pay(amount, "failed"))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::InvalidFailedAmount { .. }));
        }
        assert_eq!(till.recorded().await, 0);
    }

    #[tokio::test]
    async fn short_amount_is_recorded_without_change() {
        let till = till().await;

        let tx = till
            .payments
            .create_transaction(till.pay(1200, "failed"))
            .await
            .unwrap();
        assert_eq!(tx.payment_status, PaymentStatus::Failed);
        assert!(tx.change_amount.is_zero());
    }
}

mod pending {
    use super::*;

    #[tokio::test]
    async fn any_amount_is_recorded_without_change() {
        let till = till().await;

        for amount in [0, 2500, 9000] {
            let tx = till
                .payments
                .create_transaction(till.pay(amount, "pending"))
                .await
                .unwrap();
            assert!(tx.change_amount.is_zero());
        }
        assert_eq!(till.recorded().await, 3);
        assert_eq!(
            till.payments
                .list_transactions_by_order(till.order_id)
                .await
                .unwrap()
                .len(),
            3
        );
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let till = till().await;

        for status in ["", "PAID", "refunded"] {
            let err = till
                .payments
                .create_transaction(till.pay(2500, status))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "invalid_payment_status");
        }
        assert_eq!(till.recorded().await, 0);
    }
}

mod authoritative_total {
    use super::*;

    #[tokio::test]
    async fn stale_stored_total_is_ignored() {
        let till = till().await;
        till.payments
            .store()
            .update_order_total(till.order_id, Money::new(100))
            .await
            .unwrap();

        let err = till
            .payments
            .create_transaction(till.pay(2000, "paid"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InsufficientAmount { total, .. } if total == Money::new(2500)
        ));
    }

    #[tokio::test]
    async fn trashed_lines_do_not_count() {
        let till = till().await;
        let store = till.payments.store();
        let tea_line = store
            .find_order_items_by_order(till.order_id)
            .await
            .unwrap()
            .into_iter()
            .find(|item| item.product_id == till.tea)
            .unwrap();
        store.trash_order_item(tea_line.id).await.unwrap();

        let tx = till
            .payments
            .create_transaction(till.pay(2500, "paid"))
            .await
            .unwrap();
        assert_eq!(tx.change_amount, Money::new(500));
    }

    #[tokio::test]
    async fn update_sees_the_edited_order() {
        let till = till().await;
        let tx = till
            .payments
            .create_transaction(till.pay(3000, "paid"))
            .await
            .unwrap();

        till.orders
            .update_order(UpdateOrder::new(till.order_id).with_new(till.tea, 2))
            .await
            .unwrap();

        let err = till
            .payments
            .update_transaction(UpdateTransaction::new(tx.id, till.pay(3000, "paid")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientAmount { .. }));

        let updated = till
            .payments
            .update_transaction(UpdateTransaction::new(tx.id, till.pay(4000, "paid")))
            .await
            .unwrap();
        assert_eq!(updated.change_amount, Money::new(500));

        // Rejected update left the stored row as last written.
        let stored = till
            .payments
            .store()
            .find_transaction(tx.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn trashed_order_cannot_be_paid() {
        let till = till().await;
        till.orders.trash_order(till.order_id).await.unwrap();

        let err = till
            .payments
            .create_transaction(till.pay(3000, "paid"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "order", .. }));
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn bulk_restore_and_delete_transactions() {
        let till = till().await;
        let first = till
            .payments
            .create_transaction(till.pay(0, "pending"))
            .await
            .unwrap();
        let second = till
            .payments
            .create_transaction(till.pay(2500, "paid"))
            .await
            .unwrap();

        till.payments.trash_transaction(first.id).await.unwrap();
        till.payments.trash_transaction(second.id).await.unwrap();
        assert!(till.payments.restore_all_transactions().await.unwrap());
        assert_eq!(
            till.payments
                .list_transactions_by_merchant(till.merchant_id)
                .await
                .unwrap()
                .len(),
            2
        );

        till.payments.trash_transaction(first.id).await.unwrap();
        assert!(till.payments.delete_transaction_permanent(first.id).await.unwrap());
        assert_eq!(till.recorded().await, 1);

        let err = till
            .payments
            .delete_transaction_permanent(second.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }
}
