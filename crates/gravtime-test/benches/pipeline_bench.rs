//! Benchmarks for full simulation runs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use gravtime_analysis::analyze;
use gravtime_core::{SeriesId, SimulationConfig};
use gravtime_runtime::{MemorySink, SimulationDriver};
use gravtime_series::SeriesWriter;

fn bench_run_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_memory");

    for rows in [11i64, 101, 1001] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter(|| {
                let config = SimulationConfig::new(100, (rows - 1) * 100);
                let mut driver = SimulationDriver::new(config).unwrap();
                let mut sink = MemorySink::new(SeriesId::new("bench"));
                black_box(driver.run_with_id(SeriesId::new("bench"), &mut sink).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_run_csv(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut n = 0u64;

    c.bench_function("run_csv_11_rows", |b| {
        b.iter(|| {
            n += 1;
            let id = SeriesId::new(format!("bench_{}", n));
            let mut writer = SeriesWriter::create(dir.path(), &id).unwrap();
            let mut driver = SimulationDriver::new(SimulationConfig::default()).unwrap();
            black_box(driver.run_with_id(id, &mut writer).unwrap())
        })
    });
}

fn bench_analyze(c: &mut Criterion) {
    let mut driver = SimulationDriver::new(SimulationConfig::new(10, 10_000)).unwrap();
    let mut sink = MemorySink::new(SeriesId::new("analyze"));
    let report = driver.run_with_id(SeriesId::new("analyze"), &mut sink).unwrap();

    c.bench_function("analyze_1001_rows", |b| {
        b.iter(|| analyze(black_box(&report.series)))
    });
}

criterion_group!(benches, bench_run_memory, bench_run_csv, bench_analyze);
criterion_main!(benches);
