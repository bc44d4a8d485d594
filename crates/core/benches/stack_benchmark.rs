// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Benchmarks for the stack variants.
//!
//! Measures:
//! - Uncontended push/pop pair latency
//! - Contended push/pop throughput at different thread counts

use std::{
    hint::black_box,
    thread,
    time::{Duration, Instant},
};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use strum::IntoEnumIterator;
use tagstack_core::{Link, NodeId, SharedStack, StackConfig, StackKind, WorkerId};

/// Thread counts for the contended benchmarks
const THREAD_COUNTS: &[usize] = &[1, 2, 4, 8];

/// Push/pop pairs each thread issues per measured iteration
const PAIRS_PER_THREAD: usize = 1_000;

fn slab(len: usize) -> Vec<Link> { (0..len).map(|_| Link::new()).collect() }

// =============================================================================
// Uncontended latency
// =============================================================================

fn bench_push_pop_pair(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_pop_pair");
    group.throughput(Throughput::Elements(2));

    for kind in StackKind::iter() {
        group.bench_function(BenchmarkId::from_parameter(kind), |b| {
            let slab = slab(1);
            let stack = kind.build(&slab, &StackConfig::default()).unwrap();
            let id = NodeId::new(0).unwrap();
            let worker = WorkerId::new(0);

            b.iter(|| {
                stack.push(black_box(id));
                black_box(stack.pop(worker));
            });
        });
    }

    group.finish();
}

// =============================================================================
// Contended throughput
// =============================================================================

/// One measured round: every thread pushes and pops `PAIRS_PER_THREAD` times.
fn contended_round(stack: &dyn SharedStack, threads: usize) {
    thread::scope(|s| {
        for t in 0..threads {
            s.spawn(move || {
                let mut id = NodeId::new(t).unwrap();
                let worker = WorkerId::new(t);
                for _ in 0..PAIRS_PER_THREAD {
                    stack.push(id);
                    // Each thread holds exactly one id between pushes.
                    id = loop {
                        if let Some(popped) = stack.pop(worker) {
                            break popped;
                        }
                    };
                }
            });
        }
    });
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(5));

    for &threads in THREAD_COUNTS {
        group.throughput(Throughput::Elements((threads * PAIRS_PER_THREAD * 2) as u64));
        for kind in StackKind::iter() {
            let id = BenchmarkId::new(kind.to_string(), threads);
            group.bench_with_input(id, &threads, |b, &threads| {
                let slab = slab(threads);
                let config = StackConfig::builder().max_workers(threads).build();
                let stack = kind.build(&slab, &config).unwrap();

                b.iter_custom(|iters| {
                    let mut total = Duration::ZERO;
                    for _ in 0..iters {
                        let start = Instant::now();
                        contended_round(stack.as_ref(), threads);
                        total += start.elapsed();
                    }
                    total
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_push_pop_pair, bench_contended);
criterion_main!(benches);
