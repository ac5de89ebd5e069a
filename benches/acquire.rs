use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use paceline::{KeyedMutex, PriorityRateLimiter, TimeWindow};

fn bench_uncontended_acquire(c: &mut Criterion) {
    let mut group = c.benchmark_group("limiter/uncontended");
    group.sample_size(200);

    group.bench_function("acquire", |b| {
        // A cap far above anything the bench can consume keeps every
        // iteration on the admission fast path.
        let limiter = PriorityRateLimiter::builder()
            .with_rate(u32::MAX, TimeWindow::Second)
            .build()
            .expect("valid configuration");

        b.iter(|| {
            let _ = black_box(limiter.acquire());
        });
    });

    group.bench_function("acquire_with_priority", |b| {
        let limiter = PriorityRateLimiter::builder()
            .with_rate(u32::MAX, TimeWindow::Second)
            .build()
            .expect("valid configuration");

        b.iter(|| {
            let _ = black_box(limiter.acquire_with_priority(black_box(7)));
        });
    });

    group.finish();
}

fn bench_keyed_mutex_hot_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_mutex/hot_key");
    group.sample_size(200);

    for fair in [false, true] {
        group.bench_function(format!("locked/fair={fair}"), |b| {
            let mutex = KeyedMutex::<&str>::builder().with_fairness(fair).build();

            b.iter(|| {
                let _ = black_box(mutex.locked(black_box("k"), || ()));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_uncontended_acquire, bench_keyed_mutex_hot_key);
criterion_main!(benches);
