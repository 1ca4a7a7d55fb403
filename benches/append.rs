use criterion::{black_box, BatchSize, BenchmarkId, Criterion};
use criterion::{criterion_group, criterion_main};
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

use tslog::{FileStore, FileStoreConfig, MemoryStore, Series, TimeSeriesItem};

const APPENDS_PER_ITER: u64 = 200;

#[derive(Clone, Serialize, Deserialize)]
struct Sample {
    timestamp_ns: u64,
    value: f64,
}

impl TimeSeriesItem for Sample {
    fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }
}

fn samples(start: u64, n: u64) -> Vec<Sample> {
    (start..start + n)
        .map(|ts| Sample { timestamp_ns: ts, value: ts as f64 })
        .collect()
}

fn bench_append_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_memory");
    for &existing in &[0_u64, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(existing), &existing, |b, &existing| {
            b.iter_batched(
                || {
                    let series = Series::<Sample>::open("bench", MemoryStore::new()).expect("series");
                    series.append_all(samples(0, existing)).wait().expect("seed");
                    series
                },
                |series| {
                    for i in 0..APPENDS_PER_ITER {
                        let _ = series.append(black_box(Sample {
                            timestamp_ns: existing + i,
                            value: 0.0,
                        }));
                    }
                    series.close().expect("close");
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_append_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_file");
    for &sync in &[false, true] {
        group.bench_with_input(BenchmarkId::new("sync", sync), &sync, |b, &sync| {
            b.iter_batched(
                || {
                    let dir = tempdir().expect("tempdir");
                    let store = FileStore::open_with_config(dir.path(), FileStoreConfig { sync })
                        .expect("store");
                    let series = Series::<Sample>::open("bench", store).expect("series");
                    (dir, series)
                },
                |(_dir, series)| {
                    let batch = samples(0, APPENDS_PER_ITER);
                    series.append_all(black_box(batch)).wait().expect("append_all");
                    series.close().expect("close");
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_append_memory, bench_append_file);
criterion_main!(benches);
