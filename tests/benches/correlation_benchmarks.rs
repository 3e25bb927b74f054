//! # tl-bridge Correlation Benchmarks
//!
//! | Path | What is measured |
//! |------|------------------|
//! | Pending table | register + resolve, no transport |
//! | Classification | envelope parsing of one inbound message |
//! | Round trip | request through a real client and receive loop |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tl_bridge::adapters::sim::reply_to;
use tl_bridge::domain::pending::PendingTable;
use tl_bridge::{ClientConfig, IdentityAllocator, SimulatedTransport, TlClient, WireConfig};
use tokio::sync::oneshot;

fn bench_pending_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("pending-table");
    let table = PendingTable::new();
    let allocator = IdentityAllocator::new();

    group.bench_function("register_resolve", |b| {
        b.iter(|| {
            let id = allocator.next();
            let (tx, _rx) = oneshot::channel();
            table.register(id, "bench", tx).unwrap();
            black_box(table.resolve(id, Ok(json!(null))))
        })
    });

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    let wire = WireConfig::default();

    let response = json!({
        "@type": "raw.fullAccountState",
        "@extra": "1234567",
        "balance": "1000000000",
        "last_transaction_id": {"lt": "1", "hash": "abc"},
    });
    let notification = json!({"@type": "updateSyncState", "sync_state": {"@type": "syncStateDone"}});

    group.bench_function("response", |b| {
        b.iter(|| black_box(wire.classify(response.clone())))
    });
    group.bench_function("notification", |b| {
        b.iter(|| black_box(wire.classify(notification.clone())))
    });

    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round-trip");
    group.measurement_time(Duration::from_secs(10));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap();

    let transport = Arc::new(SimulatedTransport::new());
    transport.respond_with(|request| Some(reply_to(request, json!({"@type": "ok"}))));
    let config = ClientConfig {
        poll_interval_ms: 1,
        ..ClientConfig::for_testing()
    };
    let client = TlClient::new(transport, config).unwrap();

    for concurrency in [1usize, 16, 128] {
        group.throughput(Throughput::Elements(concurrency as u64));
        group.bench_with_input(
            BenchmarkId::new("concurrent_requests", concurrency),
            &concurrency,
            |b, &concurrency| {
                b.iter(|| {
                    runtime.block_on(async {
                        let requests = (0..concurrency)
                            .map(|_| client.request(json!({"@type": "sync"}), None));
                        black_box(futures::future::join_all(requests).await)
                    })
                })
            },
        );
    }

    group.finish();
    runtime.block_on(client.close());
}

criterion_group!(benches, bench_pending_table, bench_classify, bench_round_trip);
criterion_main!(benches);
