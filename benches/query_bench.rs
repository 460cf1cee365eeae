/// Benchmark suite for the in-memory query operations
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shelfdb::{AggregateOp, Aggregation, Document, FieldFilter, FilterOp, Record, SortKey, Value};

fn synthetic_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let mut data = Document::new();
            data.insert("price".to_string(), Value::Int((i % 500) as i64));
            data.insert(
                "category".to_string(),
                Value::String(format!("cat-{}", i % 8)),
            );
            data.insert("name".to_string(), Value::String(format!("item-{}", i)));
            Record::new(format!("{:06}", i), data)
        })
        .collect()
}

fn bench_filter(c: &mut Criterion) {
    let records = synthetic_records(1000);
    let condition = FieldFilter::new("price", FilterOp::Gt, 250i64);

    c.bench_function("filter_1k", |b| {
        b.iter(|| shelfdb::ops::filter(black_box(&records), black_box(&condition)));
    });
}

fn bench_sort(c: &mut Criterion) {
    let records = synthetic_records(1000);
    let keys = [SortKey::asc("category"), SortKey::desc("price")];

    c.bench_function("sort_1k_two_keys", |b| {
        b.iter(|| shelfdb::ops::sort(black_box(&records), black_box(&keys)));
    });
}

fn bench_group_aggregate(c: &mut Criterion) {
    let records = synthetic_records(1000);
    let aggs = [Aggregation::new(AggregateOp::Sum, "price")];

    c.bench_function("group_aggregate_1k", |b| {
        b.iter(|| {
            shelfdb::ops::group_and_aggregate(black_box(&records), black_box("category"), &aggs)
        });
    });
}

criterion_group!(benches, bench_filter, bench_sort, bench_group_aggregate);
criterion_main!(benches);
