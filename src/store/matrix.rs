// src/store/matrix.rs
//
// Entity x time table. Rows are keyed by `EntityKey` (kept sorted by the
// key's total order); columns are bucket labels kept in chronological order.
// Cells are sparse: a missing cell is null, which is not the same as 0.

use std::collections::BTreeMap;

use crate::core::bucket::{latest_label, sort_labels};
use crate::core::{EntityKey, KeySchema, TimeBucket};
use crate::normalize::{MetricValue, Snapshot};

type Cells = BTreeMap<String, MetricValue>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    schema: KeySchema,
    columns: Vec<String>,
    rows: BTreeMap<EntityKey, Cells>,
}

/// What one merge changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub new_rows: usize,
    pub new_columns: usize,
    pub cells_written: usize,
    /// Observations dropped because a later one had the same key and bucket.
    pub duplicates: usize,
}

impl Matrix {
    pub fn new(schema: KeySchema) -> Self {
        Self { schema, columns: Vec::new(), rows: BTreeMap::new() }
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.rows.keys()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.columns.is_empty()
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.rows.contains_key(key)
    }

    pub fn get(&self, key: &EntityKey, column: &str) -> Option<MetricValue> {
        self.rows.get(key)?.get(column).copied()
    }

    /// One row's cells in column order.
    pub fn row(&self, key: &EntityKey) -> Option<Vec<Option<MetricValue>>> {
        let cells = self.rows.get(key)?;
        Some(self.columns.iter().map(|c| cells.get(c).copied()).collect())
    }

    /// Chronologically last parseable column; if none parse, the last one.
    pub fn latest_column(&self) -> Option<&str> {
        latest_label(&self.columns).or_else(|| self.columns.last().map(String::as_str))
    }

    /// Merge one snapshot in place.
    ///
    /// Within a bucket the last observation per key wins. A bucket that is new
    /// to the table becomes a column where only the snapshot's keys get values;
    /// every other row stays null there. Cells in other columns, and cells of
    /// rows the snapshot does not mention, are never touched.
    pub fn merge(&mut self, snapshot: &Snapshot) -> MergeReport {
        let mut report = MergeReport::default();

        let mut latest: BTreeMap<(TimeBucket, &EntityKey), MetricValue> = BTreeMap::new();
        for o in &snapshot.observations {
            if latest.insert((o.bucket, &o.key), o.value).is_some() {
                report.duplicates += 1;
            }
        }

        for bucket in snapshot.buckets() {
            let label = bucket.label();
            if !self.columns.contains(&label) {
                self.columns.push(label);
                report.new_columns += 1;
            }
        }

        for ((bucket, key), value) in latest {
            if !self.rows.contains_key(key) {
                report.new_rows += 1;
            }
            self.rows.entry(key.clone()).or_default().insert(bucket.label(), value);
            report.cells_written += 1;
        }

        sort_labels(&mut self.columns);
        report
    }

    /* ---------------- Building from persisted tables ---------------- */

    /// Add a column label if missing. Call `finish_load` afterwards.
    pub(crate) fn ensure_column(&mut self, label: &str) {
        if !self.columns.iter().any(|c| c == label) {
            self.columns.push(s!(label));
        }
    }

    pub(crate) fn ensure_row(&mut self, key: EntityKey) -> bool {
        if self.rows.contains_key(&key) {
            return false;
        }
        self.rows.insert(key, Cells::new());
        true
    }

    /// Set a cell only when a value is present; null never overwrites.
    pub(crate) fn coalesce(&mut self, key: &EntityKey, column: &str, value: Option<MetricValue>) {
        if let (Some(v), Some(cells)) = (value, self.rows.get_mut(key)) {
            cells.insert(s!(column), v);
        }
    }

    pub(crate) fn finish_load(&mut self) {
        sort_labels(&mut self.columns);
    }
}
