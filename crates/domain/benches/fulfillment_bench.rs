use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CreateOrder, CreateTransaction, OrderService, TransactionService};
use store::{CashierId, InMemoryStore, MerchantId, Money, OrderId, ProductId};

struct Seeded {
    store: InMemoryStore,
    merchant_id: MerchantId,
    cashier_id: CashierId,
    products: Vec<ProductId>,
}

async fn seed(products: usize) -> Seeded {
    let store = InMemoryStore::new();
    let merchant = store.insert_merchant("Bench Shop").await;
    let cashier = store.insert_cashier(merchant.id, "Bench").await;

    let mut ids = Vec::with_capacity(products);
    for i in 0..products {
        let product = store
            .insert_product(
                merchant.id,
                format!("Product {i}"),
                Money::new(100 * (i as i64 + 1)),
                u32::MAX,
            )
            .await;
        ids.push(product.id);
    }

    Seeded {
        store,
        merchant_id: merchant.id,
        cashier_id: cashier.id,
        products: ids,
    }
}

fn order_with_lines(seeded: &Seeded, lines: usize) -> CreateOrder {
    seeded
        .products
        .iter()
        .take(lines)
        .fold(
            CreateOrder::new(seeded.merchant_id, seeded.cashier_id),
            |cmd, product| cmd.with_item(*product, 1),
        )
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let seeded = rt.block_on(seed(10));
    let service = OrderService::new(seeded.store.clone());

    c.bench_function("domain/create_order_1_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .create_order(order_with_lines(&seeded, 1))
                    .await
                    .unwrap();
            });
        });
    });

    c.bench_function("domain/create_order_10_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .create_order(order_with_lines(&seeded, 10))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_settlement(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let seeded = rt.block_on(seed(10));
    let orders = OrderService::new(seeded.store.clone());
    let payments = TransactionService::new(seeded.store.clone());
    let order_id: OrderId = rt.block_on(async {
        orders
            .create_order(order_with_lines(&seeded, 10))
            .await
            .unwrap()
            .id
    });

    c.bench_function("domain/settle_paid_transaction", |b| {
        b.iter(|| {
            rt.block_on(async {
                payments
                    .create_transaction(CreateTransaction::new(
                        order_id,
                        seeded.merchant_id,
                        "cash",
                        Money::new(10_000),
                        "paid",
                    ))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_create_order, bench_settlement);
criterion_main!(benches);
