use std::sync::Arc;

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use shopdesk_analytics::MetricsAggregator;
use shopdesk_infra::dashboard::{DashboardHub, SnapshotSink, Subscriber, SubscriberSendError};
use shopdesk_infra::store::{InMemoryStore, InventoryRepository, ProductRepository, SaleRepository};
use shopdesk_inventory::NewInventory;
use shopdesk_products::NewProduct;
use shopdesk_sales::NewSale;

/// Sink that accepts everything.
struct NullSink;

#[async_trait::async_trait]
impl SnapshotSink for NullSink {
    async fn send(
        &self,
        snapshot: Arc<shopdesk_analytics::BusinessSnapshot>,
    ) -> Result<(), SubscriberSendError> {
        black_box(snapshot);
        Ok(())
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Catalog of `products` items, each with inventory and `sales_per_product` sales over two days.
fn seeded_store(
    rt: &tokio::runtime::Runtime,
    products: usize,
    sales_per_product: usize,
) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    let now = Utc::now();
    rt.block_on(async {
        for i in 0..products {
            let p = store
                .create_product(NewProduct {
                    name: format!("product-{i}"),
                    description: None,
                    category: format!("category-{}", i % 7),
                    price: 1.0 + (i % 50) as f64,
                })
                .await
                .unwrap();
            store
                .create_inventory(NewInventory {
                    product_id: p.id,
                    quantity: (i % 30) as i64,
                    low_stock_threshold: 10,
                })
                .await
                .unwrap();
            for j in 0..sales_per_product {
                store
                    .create_sale(NewSale {
                        product_id: p.id,
                        quantity: 1 + (j % 3) as i64,
                        total_amount: None,
                        sale_date: Some(now - Duration::minutes((j * 37) as i64 % 2880)),
                    })
                    .await
                    .unwrap();
            }
        }
    });
    store
}

fn bench_compute_snapshot(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("compute_snapshot");

    for products in [10usize, 100, 500] {
        let store = seeded_store(&rt, products, 20);
        let aggregator = MetricsAggregator::new(store);
        group.throughput(Throughput::Elements((products * 20) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(products), &products, |b, _| {
            b.iter(|| rt.block_on(aggregator.compute_snapshot(black_box(Utc::now()))).unwrap());
        });
    }

    group.finish();
}

fn bench_broadcast_fan_out(c: &mut Criterion) {
    let rt = runtime();
    let store = seeded_store(&rt, 100, 10);
    let mut group = c.benchmark_group("broadcast_tick");

    for subscribers in [1usize, 50, 500] {
        let hub = DashboardHub::new(store.clone());
        rt.block_on(async {
            for _ in 0..subscribers {
                hub.subscribe(Subscriber::new(Arc::new(NullSink))).await.unwrap();
            }
        });
        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(subscribers), &subscribers, |b, _| {
            b.iter(|| rt.block_on(hub.tick()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compute_snapshot, bench_broadcast_fan_out);
criterion_main!(benches);
