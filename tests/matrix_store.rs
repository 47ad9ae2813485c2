// tests/matrix_store.rs
use std::io;
use std::path::PathBuf;

use ranksnap::core::{EntityKey, KeyField, KeySchema, TimeBucket};
use ranksnap::normalize::{Observation, Snapshot};
use ranksnap::store::{Matrix, MatrixStore, MemStorage, Storage};
use ranksnap::Error;

fn schema() -> KeySchema {
    KeySchema::new(vec![KeyField::numeric("category_no", 3)])
}

fn obs(key: &str, label: &str, value: u64) -> Observation {
    Observation {
        key: EntityKey::single(key),
        bucket: TimeBucket::parse(label).unwrap(),
        value,
        name: String::new(),
    }
}

fn snap(items: &[(&str, &str, u64)]) -> Snapshot {
    Snapshot::new(items.iter().map(|(k, l, v)| obs(k, l, *v)).collect())
}

fn key(k: &str) -> EntityKey {
    EntityKey::single(k)
}

const T0: &str = "2024-01-01T00:00:00Z";
const T1: &str = "2024-01-01T01:00:00Z";
const T2: &str = "2024-01-01T02:00:00Z";
const T3: &str = "2024-01-01T03:00:00Z";

#[test]
fn end_to_end_scenario() {
    let mem = MemStorage::new();
    let store = MatrixStore::new(&mem, schema());

    let (m, report) = store.load();
    assert!(!report.found);
    let m = store.merge(m, &snap(&[("001", T0, 10)]));
    assert_eq!(m.row_count(), 1);
    assert_eq!(m.columns(), &[T0]);
    assert_eq!(m.get(&key("001"), T0), Some(10));
    store.persist(&m).unwrap();

    let (m, _) = store.load();
    let m = store.merge(m, &snap(&[("001", T1, 20), ("002", T1, 5)]));
    let keys: Vec<String> = m.keys().map(|k| k.label()).collect();
    assert_eq!(keys, vec!["001", "002"]);
    assert_eq!(m.columns(), &[T0, T1]);
    assert_eq!(m.row(&key("001")).unwrap(), vec![Some(10), Some(20)]);
    assert_eq!(m.row(&key("002")).unwrap(), vec![None, Some(5)]);
    store.persist(&m).unwrap();

    let text = mem.get("matrix.csv").unwrap();
    let body = text.trim_start_matches('\u{feff}');
    assert_eq!(
        body,
        "category_no,2024-01-01T00:00:00Z,2024-01-01T01:00:00Z\n001,10,20\n002,,5\n"
    );
}

#[test]
fn merging_the_same_snapshot_twice_changes_nothing() {
    let s = snap(&[("001", T0, 3), ("002", T0, 4)]);
    let mut once = Matrix::new(schema());
    once.merge(&s);
    let mut twice = once.clone();
    twice.merge(&s);
    assert_eq!(once, twice);
}

#[test]
fn one_column_per_distinct_bucket_regardless_of_rows() {
    let mut m = Matrix::new(schema());
    m.merge(&snap(&[("001", T0, 1)]));
    m.merge(&snap(&[("002", T1, 1), ("003", T1, 1)]));
    m.merge(&snap(&[]));
    m.merge(&snap(&[("004", T2, 1)]));
    m.merge(&snap(&[("001", T2, 9)]));
    assert_eq!(m.column_count(), 3);
}

#[test]
fn new_row_leaves_other_rows_untouched() {
    let mut m = Matrix::new(schema());
    m.merge(&snap(&[("001", T0, 1), ("002", T0, 2)]));
    m.merge(&snap(&[("001", T1, 3)]));
    let before_1 = m.row(&key("001")).unwrap();
    let before_2 = m.row(&key("002")).unwrap();

    let report = m.merge(&snap(&[("003", T1, 7)]));
    assert_eq!(report.new_rows, 1);
    assert_eq!(m.row_count(), 3);
    assert_eq!(m.row(&key("001")).unwrap(), before_1);
    assert_eq!(m.row(&key("002")).unwrap(), before_2);
}

#[test]
fn later_duplicate_wins_in_the_persisted_cell() {
    let mem = MemStorage::new();
    let store = MatrixStore::new(&mem, schema());
    let (m, _) = store.load();
    let m = store.merge(m, &snap(&[("001", T0, 5), ("002", T0, 1), ("001", T0, 8)]));
    store.persist(&m).unwrap();

    let (reloaded, _) = store.load();
    assert_eq!(reloaded.get(&key("001"), T0), Some(8));
}

#[test]
fn columns_end_up_chronological_whatever_the_call_order() {
    let mut m = Matrix::new(schema());
    m.merge(&snap(&[("001", T2, 2)]));
    m.merge(&snap(&[("001", T1, 1)]));
    m.merge(&snap(&[("001", T3, 3)]));
    assert_eq!(m.columns(), &[T1, T2, T3]);
}

#[test]
fn unparseable_labels_sort_after_valid_ones_in_original_order() {
    let mem = MemStorage::new().with_file(
        "matrix.csv",
        "category_no,zeta,2024-01-01T02:00:00Z,alpha,2024-01-01T01:00:00Z\n1,,2,,1\n",
    );
    let store = MatrixStore::new(&mem, schema());
    let (m, _) = store.load();
    assert_eq!(m.columns(), &[T1, T2, "zeta", "alpha"]);
    let m = store.merge(m, &snap(&[("001", T0, 0)]));
    assert_eq!(m.columns(), &[T0, T1, T2, "zeta", "alpha"]);
    assert_eq!(m.latest_column(), Some(T2));
}

#[test]
fn corrupted_file_does_not_block_the_run() {
    let mem = MemStorage::new().with_file("matrix.csv", "\u{feff}2024-01-01T00:00:00Z,2024-01-01T01:00:00Z\n12,\"unterminated\n");
    let store = MatrixStore::new(&mem, schema());

    let (m, mut report) = store.load();
    assert!(report.reset);
    assert!(m.is_empty());
    // reading alone moves nothing
    assert_eq!(report.set_aside, None);
    assert_eq!(mem.names(), vec!["matrix.csv"]);

    let m = store.merge(m, &snap(&[("001", T0, 10)]));
    store.recover(&mut report).unwrap();
    let aside = report.set_aside.clone().unwrap();
    assert!(mem.get(&aside).unwrap().contains("unterminated"));
    store.persist(&m).unwrap();
    let (reloaded, report) = store.load();
    assert!(!report.reset);
    assert_eq!(reloaded.get(&key("001"), T0), Some(10));
}

#[test]
fn persisting_is_deterministic() {
    let mem = MemStorage::new();
    let store = MatrixStore::new(&mem, schema());
    let mut m = Matrix::new(schema());
    m.merge(&snap(&[("010", T1, 1), ("002", T0, 2), ("001", T1, 3)]));
    store.persist(&m).unwrap();
    let first = mem.get("matrix.csv").unwrap();

    let (reloaded, _) = store.load();
    store.persist(&reloaded).unwrap();
    assert_eq!(mem.get("matrix.csv").unwrap(), first);
}

struct ReadOnly;

impl Storage for ReadOnly {
    fn read(&self, _name: &str) -> io::Result<Option<String>> {
        Ok(None)
    }
    fn write(&self, _name: &str, _text: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }
    fn set_aside(&self, name: &str) -> io::Result<String> {
        Ok(name.to_string())
    }
    fn locate(&self, name: &str) -> PathBuf {
        PathBuf::from("/ro").join(name)
    }
}

#[test]
fn recover_refuses_when_the_old_file_cannot_be_moved() {
    struct Stuck;
    impl Storage for Stuck {
        fn read(&self, _name: &str) -> io::Result<Option<String>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
        fn write(&self, _name: &str, _text: &str) -> io::Result<()> {
            Ok(())
        }
        fn set_aside(&self, _name: &str) -> io::Result<String> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
        fn locate(&self, name: &str) -> PathBuf {
            PathBuf::from("/stuck").join(name)
        }
    }

    let store = MatrixStore::new(Stuck, schema());
    let (_, mut report) = store.load();
    assert!(report.reset);
    match store.recover(&mut report) {
        Err(Error::Persist { path, .. }) => assert_eq!(path, PathBuf::from("/stuck/matrix.csv")),
        other => panic!("expected persist error, got {other:?}"),
    }
}

#[test]
fn failed_final_write_is_surfaced() {
    let store = MatrixStore::new(ReadOnly, schema());
    let (m, _) = store.load();
    let m = store.merge(m, &snap(&[("001", T0, 1)]));
    match store.persist(&m) {
        Err(Error::Persist { path, .. }) => assert_eq!(path, PathBuf::from("/ro/matrix.csv")),
        other => panic!("expected persist error, got {other:?}"),
    }
}
