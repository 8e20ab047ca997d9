//! Benchmarks for history log push/undo throughput.
//!
//! Push cost is dominated by the redo-branch truncate and the capacity
//! eviction; undo/redo are cursor moves and should be flat regardless
//! of depth.
//!
//! Run with: cargo bench -p keel-state --bench history_bench

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use keel_state::{HistoryConfig, HistoryLog};

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_push");
    for capacity in [64usize, 256, 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                b.iter(|| {
                    let mut log = HistoryLog::new(0u64, HistoryConfig::new(capacity));
                    for i in 1..2048u64 {
                        log.push(black_box(i));
                    }
                    log
                });
            },
        );
    }
    group.finish();
}

fn bench_undo_redo_cycle(c: &mut Criterion) {
    c.bench_function("history_undo_redo_cycle", |b| {
        let mut log = HistoryLog::new(0u64, HistoryConfig::new(1024));
        for i in 1..1024u64 {
            log.push(i);
        }
        b.iter(|| {
            for _ in 0..512 {
                log.undo();
            }
            for _ in 0..512 {
                log.redo();
            }
            black_box(*log.value())
        });
    });
}

fn bench_push_after_undo(c: &mut Criterion) {
    // Worst case for push: a deep redo branch to truncate.
    c.bench_function("history_push_truncating_branch", |b| {
        b.iter(|| {
            let mut log = HistoryLog::new(0u64, HistoryConfig::new(1024));
            for i in 1..512u64 {
                log.push(i);
            }
            for _ in 0..511 {
                log.undo();
            }
            log.push(black_box(9999));
            log
        });
    });
}

criterion_group!(benches, bench_push, bench_undo_redo_cycle, bench_push_after_undo);
criterion_main!(benches);
