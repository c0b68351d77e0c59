//! Transaction settlement service.

use common::{MerchantId, Money, OrderId, PaymentStatus, TransactionId};
use store::{NewTransaction, PosStore, Transaction, TransactionUpdate};

use crate::error::{Result, ServiceError};
use crate::{lookup, settlement};

use super::{CreateTransaction, UpdateTransaction};

/// Service for recording payments against orders.
///
/// The order total used for validation is always recomputed from the live
/// line items. The `total_price` stored on the order is not consulted.
pub struct TransactionService<S: PosStore> {
    store: S,
}

impl<S: PosStore> TransactionService<S> {
    /// Creates a new transaction service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validates a payment against the order total and records it.
    ///
    /// Nothing is written when validation fails.
    #[tracing::instrument(
        skip(self, cmd),
        fields(
            order_id = %cmd.order_id,
            merchant_id = %cmd.merchant_id,
            status = %cmd.payment_status
        )
    )]
    pub async fn create_transaction(&self, cmd: CreateTransaction) -> Result<Transaction> {
        lookup::require_merchant(&self.store, cmd.merchant_id).await?;
        lookup::require_order(&self.store, cmd.order_id).await?;

        let (payment_status, change_amount) = self
            .settle(cmd.order_id, cmd.amount, &cmd.payment_status)
            .await?;

        let transaction = self
            .store
            .create_transaction(NewTransaction {
                order_id: cmd.order_id,
                merchant_id: cmd.merchant_id,
                payment_method: cmd.payment_method,
                amount: cmd.amount,
                change_amount,
                payment_status,
            })
            .await?;
        metrics::counter!("transactions_created_total").increment(1);

        tracing::info!(
            transaction_id = %transaction.id,
            change = %change_amount,
            "transaction recorded"
        );
        Ok(transaction)
    }

    /// Re-validates a payment against the current order total and rewrites
    /// the recorded transaction.
    #[tracing::instrument(
        skip(self, cmd),
        fields(
            transaction_id = %cmd.transaction_id,
            order_id = %cmd.order_id,
            status = %cmd.payment_status
        )
    )]
    pub async fn update_transaction(&self, cmd: UpdateTransaction) -> Result<Transaction> {
        self.require_transaction(cmd.transaction_id).await?;
        lookup::require_merchant(&self.store, cmd.merchant_id).await?;
        lookup::require_order(&self.store, cmd.order_id).await?;

        let (payment_status, change_amount) = self
            .settle(cmd.order_id, cmd.amount, &cmd.payment_status)
            .await?;

        let transaction = self
            .store
            .update_transaction(TransactionUpdate {
                id: cmd.transaction_id,
                order_id: cmd.order_id,
                merchant_id: cmd.merchant_id,
                payment_method: cmd.payment_method,
                amount: cmd.amount,
                change_amount,
                payment_status,
            })
            .await?;

        tracing::info!(change = %change_amount, "transaction updated");
        Ok(transaction)
    }

    /// Loads a live transaction.
    #[tracing::instrument(skip(self))]
    pub async fn find_transaction(&self, id: TransactionId) -> Result<Transaction> {
        self.require_transaction(id).await
    }

    /// Lists the live transactions of a live order, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_transactions_by_order(&self, order_id: OrderId) -> Result<Vec<Transaction>> {
        lookup::require_order(&self.store, order_id).await?;
        Ok(self.store.find_transactions_by_order(order_id).await?)
    }

    /// Lists the live transactions of a merchant, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_transactions_by_merchant(
        &self,
        merchant_id: MerchantId,
    ) -> Result<Vec<Transaction>> {
        lookup::require_merchant(&self.store, merchant_id).await?;
        Ok(self.store.find_transactions_by_merchant(merchant_id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn trash_transaction(&self, id: TransactionId) -> Result<Transaction> {
        let transaction = self.store.trash_transaction(id).await?;
        tracing::info!("transaction trashed");
        Ok(transaction)
    }

    #[tracing::instrument(skip(self))]
    pub async fn restore_transaction(&self, id: TransactionId) -> Result<Transaction> {
        let transaction = self.store.restore_transaction(id).await?;
        tracing::info!("transaction restored");
        Ok(transaction)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_transaction_permanent(&self, id: TransactionId) -> Result<bool> {
        self.store.delete_transaction_permanent(id).await?;
        tracing::info!("transaction permanently deleted");
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    pub async fn restore_all_transactions(&self) -> Result<bool> {
        let restored = self.store.restore_all_transactions().await?;
        tracing::info!(restored, "all trashed transactions restored");
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_all_transactions_permanent(&self) -> Result<bool> {
        let deleted = self.store.delete_all_transactions_permanent().await?;
        tracing::info!(deleted, "all trashed transactions permanently deleted");
        Ok(true)
    }

    async fn require_transaction(&self, id: TransactionId) -> Result<Transaction> {
        self.store
            .find_transaction(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Transaction::ENTITY, id))
    }

    /// Computes the live order total, parses the status and applies the
    /// settlement rule. Returns the parsed status and the change owed.
    async fn settle(
        &self,
        order_id: OrderId,
        amount: Money,
        payment_status: &str,
    ) -> Result<(PaymentStatus, Money)> {
        let items = self.store.find_order_items_by_order(order_id).await?;
        let total = settlement::order_total(&items)
            .ok_or(ServiceError::AmountOverflow { order_id })?;

        let outcome = payment_status
            .parse::<PaymentStatus>()
            .map_err(ServiceError::from)
            .and_then(|status| Ok((status, settlement::settle(status, amount, total)?)));

        if let Err(err) = &outcome {
            metrics::counter!("settlement_rejections_total", "reason" => err.kind()).increment(1);
            tracing::warn!(%amount, %total, error = %err, "payment rejected");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{CreateOrder, OrderService};
    use store::InMemoryStore;

    struct Fixture {
        service: TransactionService<InMemoryStore>,
        merchant_id: MerchantId,
        order_id: OrderId,
    }

    /// An order worth 2500: two coffees at 1000 and one tea at 500.
    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let merchant = store.insert_merchant("Corner Shop").await;
        let cashier = store.insert_cashier(merchant.id, "Alice").await;
        let coffee = store
            .insert_product(merchant.id, "Coffee", Money::new(1000), 10)
            .await;
        let tea = store
            .insert_product(merchant.id, "Tea", Money::new(500), 10)
            .await;

        let order = OrderService::new(store.clone())
            .create_order(
                CreateOrder::new(merchant.id, cashier.id)
                    .with_item(coffee.id, 2)
                    .with_item(tea.id, 1),
            )
            .await
            .unwrap();

        Fixture {
            service: TransactionService::new(store),
            merchant_id: merchant.id,
            order_id: order.id,
        }
    }

    fn payment(f: &Fixture, amount: i64, status: &str) -> CreateTransaction {
        CreateTransaction::new(f.order_id, f.merchant_id, "cash", Money::new(amount), status)
    }

    #[tokio::test]
    async fn paid_transaction_records_change() {
        let f = fixture().await;

        let tx = f
            .service
            .create_transaction(payment(&f, 3000, "paid"))
            .await
            .unwrap();
        assert_eq!(tx.change_amount, Money::new(500));
        assert_eq!(tx.payment_status, PaymentStatus::Paid);
        assert_eq!(tx.amount, Money::new(3000));
    }

    #[tokio::test]
    async fn rejected_payment_persists_nothing() {
        let f = fixture().await;

        let err = f
            .service
            .create_transaction(payment(&f, 2000, "paid"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientAmount { .. }));

        let err = f
            .service
            .create_transaction(payment(&f, 2500, "failed"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidFailedAmount { .. }));

        let err = f
            .service
            .create_transaction(payment(&f, 2500, "refunded"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPaymentStatus(_)));

        assert_eq!(f.service.store().transaction_count().await, 0);
    }

    #[tokio::test]
    async fn missing_references_are_not_found() {
        let f = fixture().await;

        let mut cmd = payment(&f, 3000, "paid");
        cmd.merchant_id = MerchantId::new(77);
        let err = f.service.create_transaction(cmd).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "merchant", .. }));

        let mut cmd = payment(&f, 3000, "paid");
        cmd.order_id = OrderId::new(77);
        let err = f.service.create_transaction(cmd).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "order", .. }));

        let err = f
            .service
            .update_transaction(UpdateTransaction::new(
                TransactionId::new(5),
                payment(&f, 3000, "paid"),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "transaction", .. }));
    }

    #[tokio::test]
    async fn update_recomputes_change() {
        let f = fixture().await;
        let tx = f
            .service
            .create_transaction(payment(&f, 0, "pending"))
            .await
            .unwrap();
        assert!(tx.change_amount.is_zero());

        let updated = f
            .service
            .update_transaction(UpdateTransaction::new(tx.id, payment(&f, 5000, "paid")))
            .await
            .unwrap();
        assert_eq!(updated.id, tx.id);
        assert_eq!(updated.change_amount, Money::new(2500));
        assert_eq!(updated.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn lifecycle_does_not_touch_the_order() {
        let f = fixture().await;
        let tx = f
            .service
            .create_transaction(payment(&f, 2500, "paid"))
            .await
            .unwrap();

        f.service.trash_transaction(tx.id).await.unwrap();
        assert!(matches!(
            f.service.find_transaction(tx.id).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
        assert!(
            f.service
                .list_transactions_by_order(f.order_id)
                .await
                .unwrap()
                .is_empty()
        );

        let restored = f.service.restore_transaction(tx.id).await.unwrap();
        assert_eq!(restored, tx);

        f.service.trash_transaction(tx.id).await.unwrap();
        assert!(f.service.delete_all_transactions_permanent().await.unwrap());
        assert_eq!(f.service.store().transaction_count().await, 0);
        assert_eq!(f.service.store().order_count().await, 1);
    }
}
