// src/roster.rs
//
// Roster Tracker: latest display name and first/last sighting per key.
// `first_seen` is written once, the first time a key shows up, and never
// moved afterwards. `last_seen` and the name follow the latest snapshot.
//
// A roster file that cannot be used loads as empty and is flagged; `recover`
// moves it aside before the next write so its history is not overwritten.

use std::collections::BTreeMap;

use crate::config::consts::{ROSTER_FILE, TABLE_SEP, WRITE_BOM};
use crate::core::csv::Table;
use crate::core::{EntityKey, KeySchema, TimeBucket};
use crate::error::{Error, Result};
use crate::normalize::Snapshot;
use crate::store::{self, Storage};

pub const ROSTER_HEADER: [&str; 4] = ["entity_key", "display_name", "first_seen", "last_seen"];

const KEY_ALIASES: &[&str] = &["entity_key", "key"];
const NAME_ALIASES: &[&str] = &["display_name", "name", "user_nick", "nickname", "category_name", "channelName"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterRecord {
    pub display_name: String,
    pub first_seen: TimeBucket,
    pub last_seen: TimeBucket,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RosterUpdate {
    pub new_keys: usize,
    pub renamed: usize,
}

/// The roster file existed but nothing could be taken from it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RosterReset {
    pub reason: String,
    pub set_aside: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Roster {
    schema: KeySchema,
    records: BTreeMap<EntityKey, RosterRecord>,
}

impl Roster {
    pub fn new(schema: KeySchema) -> Self {
        Self { schema, records: BTreeMap::new() }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &EntityKey) -> Option<&RosterRecord> {
        self.records.get(key)
    }

    pub fn name_of(&self, key: &EntityKey) -> &str {
        self.records.get(key).map(|r| r.display_name.as_str()).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &RosterRecord)> {
        self.records.iter()
    }

    /// Apply one snapshot. An empty observed name keeps the stored one.
    pub fn update(&mut self, snapshot: &Snapshot) -> RosterUpdate {
        let mut out = RosterUpdate::default();
        for o in &snapshot.observations {
            match self.records.get_mut(&o.key) {
                Some(rec) => {
                    rec.last_seen = o.bucket;
                    if !o.name.is_empty() && rec.display_name != o.name {
                        logd!("Roster: {} renamed {:?} -> {:?}", o.key, rec.display_name, o.name);
                        rec.display_name = o.name.clone();
                        out.renamed += 1;
                    }
                }
                None => {
                    self.records.insert(
                        o.key.clone(),
                        RosterRecord { display_name: o.name.clone(), first_seen: o.bucket, last_seen: o.bucket },
                    );
                    out.new_keys += 1;
                }
            }
        }
        out
    }

    /* ---------------- Persistence ---------------- */

    /// Best-effort read that never touches the file. An unusable file gives
    /// an empty roster plus the reason.
    pub fn load<S: Storage>(storage: &S, schema: KeySchema) -> (Self, Option<RosterReset>) {
        let where_ = storage.locate(ROSTER_FILE);
        let text = match storage.read(ROSTER_FILE) {
            Ok(Some(t)) => t,
            Ok(None) => return (Self::new(schema), None),
            Err(e) => {
                logw!("Roster: cannot read {} ({e}); starting empty", where_.display());
                return (Self::new(schema), Some(RosterReset { reason: e.to_string(), ..Default::default() }));
            }
        };
        match Self::from_table(schema.clone(), &Table::parse(&text, TABLE_SEP)) {
            Ok(roster) => (roster, None),
            Err(reason) => {
                logw!("Roster: {} unusable ({reason}); starting empty", where_.display());
                (Self::new(schema), Some(RosterReset { reason, set_aside: None }))
            }
        }
    }

    /// Move an unusable roster file aside before it is replaced.
    pub fn recover<S: Storage>(storage: &S, reset: &mut Option<RosterReset>) -> Result<()> {
        if let Some(r) = reset.as_mut().filter(|r| r.set_aside.is_none()) {
            r.set_aside = store::set_aside_before_rewrite(storage, ROSTER_FILE)?;
        }
        Ok(())
    }

    /// Rebuild from any table with a recognizable key column. An empty table
    /// is an empty roster.
    pub fn from_table(schema: KeySchema, table: &Table) -> std::result::Result<Self, String> {
        let mut roster = Self::new(schema);
        if table.header.is_empty() && table.rows.is_empty() {
            return Ok(roster);
        }
        let single = roster.schema.fields().first().filter(|_| roster.schema.arity() == 1);
        let key_col = table
            .header_index(|h| KEY_ALIASES.iter().any(|a| h.eq_ignore_ascii_case(a)))
            .or_else(|| single.and_then(|f| table.header_index(|h| f.matches_header(h))));
        let Some(key_col) = key_col else {
            return Err(format!("no key column in {:?}", table.header));
        };
        let name_col = table.header_index(|h| NAME_ALIASES.iter().any(|a| h.eq_ignore_ascii_case(a)));
        let first_col = table.header_index(|h| h.eq_ignore_ascii_case("first_seen"));
        let last_col = table.header_index(|h| h.eq_ignore_ascii_case("last_seen"));

        let cell = |row: &[String], i: Option<usize>| -> String {
            i.and_then(|i| row.get(i)).map(|s| s.trim().to_string()).unwrap_or_default()
        };

        let mut skipped = 0usize;
        for row in &table.rows {
            let Some(key) = roster.schema.key_from_label(&cell(row, Some(key_col))) else {
                skipped += 1;
                continue;
            };
            let first = TimeBucket::parse(&cell(row, first_col));
            let last = TimeBucket::parse(&cell(row, last_col));
            let (first_seen, last_seen) = match (first, last) {
                (Some(f), Some(l)) => (f, l),
                (Some(b), None) | (None, Some(b)) => (b, b),
                (None, None) => {
                    skipped += 1;
                    continue;
                }
            };
            // later rows were written more recently
            roster
                .records
                .insert(key, RosterRecord { display_name: cell(row, name_col), first_seen, last_seen });
        }
        if skipped > 0 {
            logw!("Roster: skipped {skipped} unreadable row(s)");
        }
        Ok(roster)
    }

    pub fn to_table(&self) -> Table {
        let mut t = Table::new(ROSTER_HEADER.iter().map(|h| s!(*h)).collect());
        for (key, rec) in &self.records {
            t.rows.push(vec![key.label(), rec.display_name.clone(), rec.first_seen.label(), rec.last_seen.label()]);
        }
        t
    }

    pub fn persist<S: Storage>(&self, storage: &S) -> Result<()> {
        let text = self.to_table().render(TABLE_SEP, WRITE_BOM);
        storage.write(ROSTER_FILE, &text).map_err(|e| {
            let path = storage.locate(ROSTER_FILE);
            loge!("Roster: write failed for {}: {e}", path.display());
            Error::persist(path, e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::KeyField;
    use crate::normalize::Observation;

    fn schema() -> KeySchema {
        KeySchema::new(vec![KeyField::text("user_id")])
    }

    fn snap(label: &str, items: &[(&str, &str)]) -> Snapshot {
        let bucket = TimeBucket::parse(label).unwrap();
        Snapshot::new(
            items
                .iter()
                .map(|(k, n)| Observation { key: EntityKey::single(*k), bucket, value: 1, name: s!(*n) })
                .collect(),
        )
    }

    #[test]
    fn first_seen_sticks_and_name_follows() {
        let mut r = Roster::new(schema());
        r.update(&snap("2024-01-01T00:00:00Z", &[("u1", "old")]));
        let up = r.update(&snap("2024-01-01T05:00:00Z", &[("u1", "new"), ("u2", "")]));
        assert_eq!(up, RosterUpdate { new_keys: 1, renamed: 1 });

        let u1 = r.get(&EntityKey::single("u1")).unwrap();
        assert_eq!(u1.display_name, "new");
        assert_eq!(u1.first_seen.label(), "2024-01-01T00:00:00Z");
        assert_eq!(u1.last_seen.label(), "2024-01-01T05:00:00Z");

        r.update(&snap("2024-01-01T06:00:00Z", &[("u1", "")]));
        assert_eq!(r.name_of(&EntityKey::single("u1")), "new");
    }

    #[test]
    fn legacy_master_file_loads_and_later_rows_win() {
        let t = Table::parse(
            "user_id,user_nick,first_seen,last_seen\n\
             u1,a,2024-01-01 00:00:00+00:00,2024-01-01 01:00:00+00:00\n\
             u1,b,2024-01-01 00:00:00+00:00,2024-01-01 02:00:00+00:00\n\
             ,x,2024-01-01T00:00:00Z,\n",
            ',',
        );
        let r = Roster::from_table(schema(), &t).unwrap();
        assert_eq!(r.len(), 1);
        let u1 = r.get(&EntityKey::single("u1")).unwrap();
        assert_eq!(u1.display_name, "b");
        assert_eq!(u1.last_seen.label(), "2024-01-01T02:00:00Z");
        assert_eq!(r.to_table().header, row!["entity_key", "display_name", "first_seen", "last_seen"]);
    }

    #[test]
    fn unusable_file_is_kept_aside_not_overwritten() {
        let old = "uid,nick,first_seen,last_seen\nu1,a,2023-01-01T00:00:00Z,2023-06-01T00:00:00Z\n";
        let mem = crate::store::MemStorage::new().with_file(ROSTER_FILE, old);

        let (mut r, mut reset) = Roster::load(&mem, schema());
        assert!(r.is_empty());
        assert!(reset.is_some());
        // loading alone leaves the file where it was
        assert_eq!(mem.names(), vec![ROSTER_FILE]);

        r.update(&snap("2024-01-01T00:00:00Z", &[("u1", "a")]));
        Roster::recover(&mem, &mut reset).unwrap();
        r.persist(&mem).unwrap();

        let aside = reset.unwrap().set_aside.unwrap();
        assert!(aside.starts_with("roster.csv.unreadable-"));
        assert_eq!(mem.get(&aside).as_deref(), Some(old));
        assert!(mem.get(ROSTER_FILE).unwrap().contains("u1,a,2024-01-01T00:00:00Z"));
    }

    #[test]
    fn empty_file_is_an_empty_roster() {
        let mem = crate::store::MemStorage::new().with_file(ROSTER_FILE, "");
        let (r, reset) = Roster::load(&mem, schema());
        assert!(r.is_empty());
        assert_eq!(reset, None);
    }
}
