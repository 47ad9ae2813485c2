// benches/merge.rs
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use chrono::{Duration, TimeZone, Utc};

use ranksnap::core::csv::Table;
use ranksnap::core::{EntityKey, KeyField, KeySchema, TimeBucket};
use ranksnap::normalize::{Observation, Snapshot};
use ranksnap::store::{self, Matrix, MatrixStore, MemStorage};

const ROWS: usize = 3_000;
const HOURS: i64 = 24 * 14;

fn schema() -> KeySchema {
    KeySchema::new(vec![KeyField::numeric("category_no", 8)])
}

fn hour_snapshot(h: i64, rows: usize) -> Snapshot {
    let bucket = TimeBucket::floor(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(h));
    Snapshot::new(
        (0..rows)
            .map(|i| Observation {
                key: EntityKey::single(format!("{:08}", (i * 7 + h as usize) % (rows * 2))),
                bucket,
                value: (i * 31 % 997) as u64,
                name: String::new(),
            })
            .collect(),
    )
}

/// Two weeks of hourly history with row churn.
fn history() -> Matrix {
    let mut m = Matrix::new(schema());
    for h in 0..HOURS {
        m.merge(&hour_snapshot(h, ROWS));
    }
    m
}

fn bench_merge(c: &mut Criterion) {
    let base = history();
    let next = hour_snapshot(HOURS, ROWS);

    c.bench_function("merge_one_hour", |b| {
        b.iter_batched(
            || base.clone(),
            |mut m| black_box(m.merge(black_box(&next))),
            BatchSize::LargeInput,
        )
    });

    let mem = MemStorage::new();
    let store = MatrixStore::new(&mem, schema());
    c.bench_function("persist_full_table", |b| {
        b.iter(|| store.persist(black_box(&base)).map_err(|e| e.to_string()))
    });

    if store.persist(&base).is_ok() {
        c.bench_function("load_full_table", |b| b.iter(|| black_box(store.load().0.row_count())));
    }

    let text = store::to_table(&base).render(',', true);
    c.bench_function("parse_full_table", |b| b.iter(|| black_box(Table::parse(black_box(&text), ',').rows.len())));
}

criterion_group!(benches, bench_merge);
criterion_main!(benches);
