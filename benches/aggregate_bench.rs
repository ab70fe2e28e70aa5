use asn_collector::{aggregate, read_records, PrefixLengths, ResolutionResult, SourceKind};
use criterion::{criterion_group, criterion_main, Criterion};
use std::collections::HashMap;
use std::hint::black_box;

fn sample_input(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("{} 45.{}.{}.{}\n", i, 100 + i % 64, (i / 7) % 256, i % 250 + 1))
        .collect()
}

fn benchmark_ingest(c: &mut Criterion) {
    let input = sample_input(10_000);
    c.bench_function("read_records_10k", |b| {
        b.iter(|| read_records(black_box(input.as_bytes()), PrefixLengths::default()))
    });
}

fn benchmark_aggregate(c: &mut Criterion) {
    let records = read_records(sample_input(10_000).as_bytes(), PrefixLengths::default())
        .expect("in-memory input");
    let results: HashMap<_, _> = records
        .iter()
        .map(|r| {
            let mut result = ResolutionResult::unresolved(r.subnet);
            result.asn = Some(64500);
            result.source = Some(SourceKind::Ripe);
            (r.subnet, result)
        })
        .collect();

    c.bench_function("aggregate_10k", |b| {
        b.iter(|| aggregate(black_box(&records), black_box(&results)))
    });
}

criterion_group!(benches, benchmark_ingest, benchmark_aggregate);
criterion_main!(benches);
