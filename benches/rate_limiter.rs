use criterion::{black_box, criterion_group, criterion_main, Criterion};
use eventgate::events::{listener_fn, Event, EventDispatcher};
use eventgate::rate_limit::{RateLimiterConfig, TokenBucketLimiter};
use std::time::Duration;

fn allow_single_key(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    // Large budget so the bucket never runs dry mid-benchmark.
    let config = RateLimiterConfig::new(u32::MAX, Duration::from_secs(1)).unwrap();
    let limiter = rt.block_on(async { TokenBucketLimiter::start(config, None) });

    c.bench_function("allow_single_key", |b| {
        b.iter(|| black_box(limiter.allow(black_box("203.0.113.1"))));
    });

    rt.block_on(limiter.stop());
}

fn allow_many_keys(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = RateLimiterConfig::new(100, Duration::from_secs(60)).unwrap();
    let limiter = rt.block_on(async { TokenBucketLimiter::start(config, None) });
    let keys: Vec<String> = (0..10_000).map(|i| format!("user:{i}")).collect();
    let mut next = 0usize;

    c.bench_function("allow_10k_keys", |b| {
        b.iter(|| {
            next = (next + 1) % keys.len();
            black_box(limiter.allow(&keys[next]))
        });
    });

    rt.block_on(limiter.stop());
}

fn dispatch_sync(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dispatcher = EventDispatcher::new();
    for _ in 0..4 {
        dispatcher.listen("bench", listener_fn(|_event: Event| async { Ok(()) }));
    }
    let event = Event::named("bench");

    c.bench_function("dispatch_sync_4_listeners", |b| {
        b.to_async(&rt).iter(|| async {
            let _ = black_box(dispatcher.dispatch(black_box(&event)).await);
        });
    });
}

criterion_group!(benches, allow_single_key, allow_many_keys, dispatch_sync);
criterion_main!(benches);
