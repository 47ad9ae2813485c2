// src/store/mod.rs
//
// Matrix Store: load -> merge -> persist around one persisted table.
//
// Loading never fails and never touches the file. Whatever the file looks
// like, the caller gets a usable matrix back, rebuilt as far as the layout
// allows, so a run's fresh data is never lost to old state. A file that had to
// be dropped is only moved aside by `recover`, right before it is replaced.
//
// The whole table is read and rewritten every run. That is fine at hourly
// cadence with a few thousand rows; it is not meant for more.

pub mod matrix;
pub mod storage;

use crate::config::consts::{MATRIX_FILE, TABLE_SEP, WRITE_BOM};
use crate::core::bucket::{canonical_label, is_time_label};
use crate::core::csv::Table;
use crate::core::KeySchema;
use crate::error::{Error, Result};
use crate::normalize::{MetricValue, Snapshot};

pub use matrix::{Matrix, MergeReport};
pub use storage::{FileStorage, MemStorage, Storage};

/// What `load` found and what it had to repair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub found: bool,
    pub rows: usize,
    pub columns: usize,
    /// Key columns were taken by position because no header matched.
    pub positional_keys: bool,
    pub dropped_columns: usize,
    /// Legacy labels that landed on an already-present bucket.
    pub coalesced_columns: usize,
    pub duplicate_rows: usize,
    pub skipped_rows: usize,
    pub junk_cells: usize,
    /// The file could not be used at all; an empty matrix was returned.
    pub reset: bool,
    /// Where `recover` moved the unusable file.
    pub set_aside: Option<String>,
}

impl LoadReport {
    pub fn repaired(&self) -> bool {
        self.positional_keys
            || self.coalesced_columns > 0
            || self.duplicate_rows > 0
            || self.skipped_rows > 0
            || self.junk_cells > 0
            || self.reset
    }
}

pub struct MatrixStore<S: Storage> {
    storage: S,
    schema: KeySchema,
    file: String,
}

impl<S: Storage> MatrixStore<S> {
    pub fn new(storage: S, schema: KeySchema) -> Self {
        Self { storage, schema, file: s!(MATRIX_FILE) }
    }

    pub fn with_file(mut self, name: &str) -> Self {
        self.file = s!(name);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    pub fn load(&self) -> (Matrix, LoadReport) {
        let where_ = self.storage.locate(&self.file);
        let text = match self.storage.read(&self.file) {
            Ok(Some(t)) => t,
            Ok(None) => {
                logd!("Store: {} not found, starting empty", where_.display());
                return (Matrix::new(self.schema.clone()), LoadReport::default());
            }
            Err(e) => {
                logw!("Store: cannot read {} ({e}); starting empty", where_.display());
                return self.reset(LoadReport { found: true, ..Default::default() });
            }
        };

        let table = Table::parse(&text, TABLE_SEP);
        match from_table(&self.schema, &table) {
            Ok((matrix, report)) => {
                if report.repaired() {
                    logw!(
                        "Store: {} repaired on load (positional_keys={} coalesced_cols={} dup_rows={} skipped_rows={} junk_cells={})",
                        where_.display(),
                        report.positional_keys,
                        report.coalesced_columns,
                        report.duplicate_rows,
                        report.skipped_rows,
                        report.junk_cells
                    );
                }
                logd!("Store: loaded {} rows x {} cols from {}", report.rows, report.columns, where_.display());
                (matrix, report)
            }
            Err(reason) => {
                logw!("Store: {} unusable ({reason}); starting empty", where_.display());
                self.reset(LoadReport { found: true, ..Default::default() })
            }
        }
    }

    fn reset(&self, mut report: LoadReport) -> (Matrix, LoadReport) {
        report.reset = true;
        (Matrix::new(self.schema.clone()), report)
    }

    /// Move a file that `load` had to drop out of the way before it is
    /// overwritten. A no-op unless the report says the load was reset.
    pub fn recover(&self, report: &mut LoadReport) -> Result<()> {
        if report.reset && report.set_aside.is_none() {
            report.set_aside = set_aside_before_rewrite(&self.storage, &self.file)?;
        }
        Ok(())
    }

    pub fn merge(&self, matrix: Matrix, snapshot: &Snapshot) -> Matrix {
        self.merge_with_report(matrix, snapshot).0
    }

    pub fn merge_with_report(&self, mut matrix: Matrix, snapshot: &Snapshot) -> (Matrix, MergeReport) {
        let report = matrix.merge(snapshot);
        logf!(
            "Store: merged {} obs into {} (+{} rows, +{} cols, {} dup)",
            snapshot.len(),
            self.file,
            report.new_rows,
            report.new_columns,
            report.duplicates
        );
        (matrix, report)
    }

    /// Replace the persisted table. This is the one fatal failure of the store.
    pub fn persist(&self, matrix: &Matrix) -> Result<()> {
        let text = to_table(matrix).render(TABLE_SEP, WRITE_BOM);
        self.storage.write(&self.file, &text).map_err(|e| {
            let path = self.storage.locate(&self.file);
            loge!("Store: write failed for {}: {e}", path.display());
            Error::persist(path, e)
        })?;
        logd!("Store: wrote {} rows x {} cols", matrix.row_count(), matrix.column_count());
        Ok(())
    }
}

/// Rename `file` to its `.unreadable-` name. A file that is already gone is
/// fine; any other failure is an error so the caller does not overwrite it.
pub fn set_aside_before_rewrite<S: Storage>(storage: &S, file: &str) -> Result<Option<String>> {
    match storage.set_aside(file) {
        Ok(name) => {
            logw!("Store: previous {file} kept as {name}");
            Ok(Some(name))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            let path = storage.locate(file);
            loge!("Store: could not set {} aside, not overwriting it: {e}", path.display());
            Err(Error::persist(path, e))
        }
    }
}

/// Persisted layout: key columns, then time columns; empty cell = null.
pub fn to_table(matrix: &Matrix) -> Table {
    let mut header = matrix.schema().headers();
    header.extend(matrix.columns().iter().cloned());
    let mut table = Table::new(header);
    for key in matrix.keys() {
        let mut row: Vec<String> = key.fields().to_vec();
        if let Some(cells) = matrix.row(key) {
            row.extend(cells.into_iter().map(|c| c.map(|v| v.to_string()).unwrap_or_default()));
        }
        table.rows.push(row);
    }
    table
}

/// Rebuild a matrix from any table that still has recognizable key columns.
/// `Err` only when the keys cannot be found at all.
pub fn from_table(schema: &KeySchema, table: &Table) -> std::result::Result<(Matrix, LoadReport), String> {
    let mut report = LoadReport { found: true, ..Default::default() };
    let mut matrix = Matrix::new(schema.clone());
    if table.header.iter().all(|h| h.is_empty()) {
        return Ok((matrix, report));
    }

    let key_idx = locate_keys(schema, &table.header, &mut report)?;

    // (header index, canonical label) for every value column
    let mut value_cols: Vec<(usize, String)> = Vec::new();
    for (i, h) in table.header.iter().enumerate() {
        if key_idx.contains(&i) {
            continue;
        }
        if h.is_empty() || schema.is_ignored(h) {
            report.dropped_columns += 1;
            continue;
        }
        let label = canonical_label(h);
        if value_cols.iter().any(|(_, l)| *l == label) {
            report.coalesced_columns += 1;
        }
        matrix.ensure_column(&label);
        value_cols.push((i, label));
    }

    for row in &table.rows {
        let raw: Vec<&str> = key_idx.iter().map(|&i| row.get(i).map(String::as_str).unwrap_or("")).collect();
        let Some(key) = schema.key_from(&raw) else {
            report.skipped_rows += 1;
            continue;
        };
        if !matrix.ensure_row(key.clone()) {
            report.duplicate_rows += 1;
        }
        for (i, label) in &value_cols {
            let raw = row.get(*i).map(String::as_str).unwrap_or("");
            match parse_cell(raw) {
                Some(v) => matrix.coalesce(&key, label, v),
                None => {
                    report.junk_cells += 1;
                    logw!("Store: cell {key}/{label} unreadable ({raw:?}); treated as empty");
                }
            }
        }
    }

    matrix.finish_load();
    report.rows = matrix.row_count();
    report.columns = matrix.column_count();
    Ok((matrix, report))
}

fn locate_keys(schema: &KeySchema, header: &[String], report: &mut LoadReport) -> std::result::Result<Vec<usize>, String> {
    let named: Option<Vec<usize>> = schema
        .fields()
        .iter()
        .map(|f| header.iter().position(|h| f.matches_header(h)))
        .collect();
    if let Some(idx) = named {
        return Ok(idx);
    }

    // Leading non-time cells, minus known descriptive ones, stand in for the key.
    let leading: Vec<usize> = header
        .iter()
        .enumerate()
        .take_while(|(_, h)| !is_time_label(h))
        .filter(|(_, h)| !schema.is_ignored(h))
        .map(|(i, _)| i)
        .collect();
    if leading.len() == schema.arity() {
        report.positional_keys = true;
        return Ok(leading);
    }
    Err(format!(
        "no key columns {:?} in header ({} leading non-time column(s))",
        schema.headers(),
        leading.len()
    ))
}

/// `Some(None)` empty, `Some(Some(v))` a count, `None` junk.
fn parse_cell(raw: &str) -> Option<Option<MetricValue>> {
    let s = raw.trim();
    if s.is_empty() {
        return Some(None);
    }
    if let Ok(v) = s.parse::<u64>() {
        return Some(Some(v));
    }
    if s.parse::<i64>().is_ok() {
        return Some(Some(0));
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(Some(if f < 0.0 { 0 } else { f as u64 })),
        _ => None,
    }
}
