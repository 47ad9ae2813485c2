// src/archive.rs
//
// Raw per-hour snapshot files: `<dir>/YYYY/MM/DD/HH.csv`, one row per fetched
// record, columns = every field seen (first-appearance order) plus the
// capture instant. List and object fields are written as compact JSON.
// A rerun within the same hour replaces that hour's file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::consts::{TABLE_SEP, WRITE_BOM};
use crate::core::TimeBucket;
use crate::core::csv::Table;
use crate::error::{Error, Result};
use crate::normalize::{Record, text};
use crate::store::{FileStorage, Storage};

pub const CAPTURED_AT: &str = "captured_at_utc";

pub fn snapshot_table(records: &[Record], captured_at: DateTime<Utc>) -> Table {
    let mut header: Vec<String> = Vec::new();
    for rec in records {
        for k in rec.keys() {
            if !header.iter().any(|h| h == k) {
                header.push(k.clone());
            }
        }
    }
    let stamp = captured_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut table = Table::new(header.clone());
    table.header.push(s!(CAPTURED_AT));
    for rec in records {
        let mut row: Vec<String> = header.iter().map(|h| text(rec.get(h)).unwrap_or_default()).collect();
        row.push(stamp.clone());
        table.rows.push(row);
    }
    table
}

/// Write one source's records under `dir`; returns the file written.
pub fn write_snapshot(dir: &Path, records: &[Record], captured_at: DateTime<Utc>) -> Result<PathBuf> {
    let [y, m, d, h] = TimeBucket::floor(captured_at).path_parts();
    let storage = FileStorage::new(dir.join(y).join(m).join(d));
    let name = format!("{h}.csv");
    let text = snapshot_table(records, captured_at).render(TABLE_SEP, WRITE_BOM);
    storage
        .write(&name, &text)
        .map_err(|e| Error::persist(storage.locate(&name), e))?;
    let path = storage.locate(&name);
    logd!("Archive: {} record(s) -> {}", records.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn ragged_records_share_one_header_and_lists_become_json() {
        let recs: Vec<Record> = vec![
            json!({"user_id": "a", "view_cnt": 3}).as_object().cloned().unwrap(),
            json!({"user_id": "b", "hash_tags": ["x", "y"]}).as_object().cloned().unwrap(),
        ];
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 3, 4, 5).unwrap();
        let t = snapshot_table(&recs, at);
        assert_eq!(t.header, row!["user_id", "view_cnt", "hash_tags", "captured_at_utc"]);
        assert_eq!(t.rows[0], row!["a", "3", "", "2024-01-01T03:04:05Z"]);
        assert_eq!(t.rows[1][2], r#"["x","y"]"#);
    }
}
