//! Benchmarks for the webhook hot path.
//!
//! Tracks signature verification and event parsing cost by payload size, and
//! the full router round trip against in-memory collaborators.

#![allow(clippy::unwrap_used)]

use std::{hint::black_box, sync::Arc, time::Duration};

use axum::{body::Body, http::Request};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use tokio::runtime::Runtime;
use tower::ServiceExt;
use usersync_api::{create_router, AppState, WebhookHeaders, WebhookVerifier, WEBHOOK_PATH};
use usersync_core::IdentityEvent;
use usersync_testing::{
    FixedClock, RecordingProvider, RecordingUserStore, TestSigner, UserEventBuilder,
    TEST_WEBHOOK_SECRET,
};

const NOW: i64 = 1_700_000_000;

fn verifier() -> WebhookVerifier {
    let clock = Arc::new(FixedClock::at(NOW));
    WebhookVerifier::new(TEST_WEBHOOK_SECRET, Duration::from_secs(300), clock).unwrap()
}

/// A `user.updated` body padded to roughly `size` bytes.
fn payload(size: usize) -> Vec<u8> {
    UserEventBuilder::updated("user_bench")
        .first_name("Bench")
        .field("private_metadata", json!({ "padding": "x".repeat(size) }))
        .to_body()
}

fn bench_verification(c: &mut Criterion) {
    let verifier = verifier();
    let signer = TestSigner::for_tests();

    let mut group = c.benchmark_group("verification");
    for size in [100, 1_000, 10_000, 100_000] {
        let body = payload(size);
        let signed = signer.headers("msg_bench", NOW, &body);
        let headers = WebhookHeaders {
            id: signed.id,
            timestamp: signed.timestamp,
            signature: signed.signature,
        };

        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::new("payload_size", size), &body, |b, body| {
            b.iter(|| verifier.verify(black_box(&headers), black_box(body)).unwrap());
        });
    }
    group.finish();
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    for size in [100, 10_000] {
        let body = payload(size);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::new("payload_size", size), &body, |b, body| {
            b.iter(|| IdentityEvent::parse(black_box(body)).unwrap());
        });
    }
    group.finish();
}

fn bench_router_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let clock = Arc::new(FixedClock::at(NOW));
    let state = AppState::new(
        Arc::new(RecordingUserStore::new()),
        Arc::new(RecordingProvider::new()),
        verifier(),
        clock,
    );
    let router = create_router(state);
    let signer = TestSigner::for_tests();
    let body = UserEventBuilder::deleted("user_bench").to_body();
    let headers = signer.headers("msg_bench", NOW, &body);

    c.bench_function("router/user_deleted", |b| {
        b.to_async(&rt).iter_batched(
            || {
                let mut request = Request::builder().method("POST").uri(WEBHOOK_PATH);
                for (name, value) in headers.pairs() {
                    request = request.header(name, value);
                }
                request.body(Body::from(body.clone())).unwrap()
            },
            |request| {
                let router = router.clone();
                async move { router.oneshot(request).await.unwrap() }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_verification, bench_parsing, bench_router_round_trip);
criterion_main!(benches);
