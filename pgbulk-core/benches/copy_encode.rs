use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pgbulk_core::{Column, CopyEncoder, Value, WireType};

fn columns() -> Vec<Column> {
    vec![
        Column::new("id", WireType::Integer),
        Column::new("name", WireType::Text),
        Column::new("active", WireType::Boolean),
        Column::new("created_at", WireType::Timestamp),
        Column::new("score", WireType::Double).nullable(),
    ]
}

fn rows(n: usize) -> Vec<Vec<Value>> {
    let created = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            vec![
                (i as i32).into(),
                format!("customer-{}", i).into(),
                (i % 2 == 0).into(),
                created.into(),
                if i % 5 == 0 { Value::Null } else { (i as f64 * 0.5).into() },
            ]
        })
        .collect()
}

fn bench_encode_rows(c: &mut Criterion) {
    let columns = columns();
    let mut group = c.benchmark_group("CopyEncoder::encode_row");

    for size in [100usize, 10_000] {
        let input = rows(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| {
                let mut encoder = CopyEncoder::new(&columns);
                let mut sent = 0usize;
                for row in input {
                    encoder.encode_row(row).unwrap();
                    if let Some(chunk) = encoder.take_chunk() {
                        sent += chunk.len();
                    }
                }
                sent += encoder.finish().len();
                black_box(sent)
            });
        });
    }
    group.finish();
}

fn bench_encode_projected(c: &mut Criterion) {
    let columns = columns();
    let input = rows(10_000);
    let projection = [0, 1, 2, 3, 4];

    c.bench_function("CopyEncoder::encode_projected", |b| {
        b.iter(|| {
            let mut encoder = CopyEncoder::new(&columns);
            for row in &input {
                encoder.encode_projected(row, &projection).unwrap();
                black_box(encoder.take_chunk());
            }
            black_box(encoder.finish())
        });
    });
}

criterion_group!(benches, bench_encode_rows, bench_encode_projected);
criterion_main!(benches);
