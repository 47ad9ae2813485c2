// src/ranking.rs
//
// Ranking View: read-only top-N of the latest column, joined with the roster.

use std::cmp::Reverse;

use crate::config::consts::{RANKING_FILE, TABLE_SEP, WRITE_BOM};
use crate::core::csv::Table;
use crate::core::{EntityKey, TimeBucket};
use crate::error::{Error, Result};
use crate::normalize::MetricValue;
use crate::roster::Roster;
use crate::store::{Matrix, Storage};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedRow {
    pub rank: usize,
    pub key: EntityKey,
    pub name: String,
    pub value: Option<MetricValue>,
    pub first_seen: Option<TimeBucket>,
    pub last_seen: Option<TimeBucket>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ranking {
    /// Column the ranking was taken from; `None` for a matrix without columns.
    pub column: Option<String>,
    pub key_headers: Vec<String>,
    pub rows: Vec<RankedRow>,
}

/// Rank by the latest column, descending. Null cells go after every valued
/// row; ties fall back to key order. `top_k = None` keeps everything.
pub fn rank(matrix: &Matrix, roster: &Roster, top_k: Option<usize>) -> Ranking {
    let key_headers = matrix.schema().headers();
    let Some(column) = matrix.latest_column() else {
        return Ranking { column: None, key_headers, rows: Vec::new() };
    };

    // keys() is already in key order; the sort is stable
    let mut scored: Vec<(&EntityKey, Option<MetricValue>)> =
        matrix.keys().map(|k| (k, matrix.get(k, column))).collect();
    scored.sort_by_key(|(_, v)| (v.is_none(), Reverse(*v)));
    if let Some(k) = top_k {
        scored.truncate(k);
    }

    let rows = scored
        .into_iter()
        .enumerate()
        .map(|(i, (key, value))| {
            let rec = roster.get(key);
            RankedRow {
                rank: i + 1,
                key: key.clone(),
                name: rec.map(|r| r.display_name.clone()).unwrap_or_default(),
                value,
                first_seen: rec.map(|r| r.first_seen),
                last_seen: rec.map(|r| r.last_seen),
            }
        })
        .collect();

    Ranking { column: Some(s!(column)), key_headers, rows }
}

impl Ranking {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Key columns, `display_name`, then the ranked column's label.
    pub fn to_table(&self) -> Table {
        let mut header = self.key_headers.clone();
        header.push(s!("display_name"));
        if let Some(c) = &self.column {
            header.push(c.clone());
        }
        let mut t = Table::new(header);
        for r in &self.rows {
            let mut row = r.key.fields().to_vec();
            row.push(r.name.clone());
            row.push(r.value.map(|v| v.to_string()).unwrap_or_default());
            t.rows.push(row);
        }
        t
    }

    pub fn export<S: Storage>(&self, storage: &S) -> Result<()> {
        let text = self.to_table().render(TABLE_SEP, WRITE_BOM);
        storage
            .write(RANKING_FILE, &text)
            .map_err(|e| Error::persist(storage.locate(RANKING_FILE), e))
    }

    /// Fixed-width lines for the console.
    pub fn preview(&self, limit: usize) -> Vec<String> {
        let key_w = self.rows.iter().take(limit).map(|r| r.key.label().chars().count()).max().unwrap_or(0);
        self.rows
            .iter()
            .take(limit)
            .map(|r| {
                let value = r.value.map(|v| v.to_string()).unwrap_or_else(|| s!("-"));
                format!("{:>4}. {:<key_w$}  {:>9}  {}", r.rank, r.key.label(), value, r.name)
            })
            .collect()
    }
}
