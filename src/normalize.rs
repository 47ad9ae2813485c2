// src/normalize.rs
//
// Snapshot Normalizer: one fetch cycle's raw records -> canonical observations.
//
// Every record in a call shares one bucket (capture instant floored to the
// hour). Bad fields degrade to defaults instead of dropping the record: a
// missing or unparseable metric becomes 0, a missing name becomes "". Only a
// record with no usable key at all is skipped, since it has no row to land in.
// An empty input yields an empty snapshot; callers treat that as "nothing to
// merge", never as "clear the table".

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::core::sanitize::normalize_ws;
use crate::core::{EntityKey, KeySchema, TimeBucket};

/// One raw listing item as returned by an endpoint.
pub type Record = Map<String, Value>;

/// Non-negative count. Absence is modelled with `Option`, never with 0.
pub type MetricValue = u64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    pub key: EntityKey,
    pub bucket: TimeBucket,
    pub value: MetricValue,
    pub name: String,
}

/// One cycle's observations in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub observations: Vec<Observation>,
}

impl Snapshot {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Distinct buckets, ascending.
    pub fn buckets(&self) -> Vec<TimeBucket> {
        let mut v: Vec<TimeBucket> = self.observations.iter().map(|o| o.bucket).collect();
        v.sort_unstable();
        v.dedup();
        v
    }
}

/// How duplicate keys inside one cycle are combined before the merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rollup {
    /// Keep every observation; the merge applies last-write-wins.
    #[default]
    Last,
    /// Sum per key (e.g. viewers of all lives in one category).
    Sum,
}

/// Extraction strategy: how a feed turns a record into key, metric and name.
pub trait Extractor {
    fn key_schema(&self) -> &KeySchema;

    fn metric<'r>(&self, rec: &'r Record) -> Option<&'r Value>;

    fn name(&self, rec: &Record) -> Option<String>;

    /// Raw key values in schema order; a missing field is `None`.
    fn key_values(&self, rec: &Record) -> Vec<Option<String>> {
        self.key_schema()
            .fields()
            .iter()
            .map(|f| {
                std::iter::once(&f.column)
                    .chain(f.aliases.iter())
                    .find_map(|name| text(rec.get(*name)).filter(|v| !v.is_empty()))
            })
            .collect()
    }

    fn keep(&self, _rec: &Record) -> bool {
        true
    }

    fn rollup(&self) -> Rollup {
        Rollup::Last
    }

    /// Keep only the N records with the highest metric.
    fn top_n(&self) -> Option<usize> {
        None
    }
}

/// The common case: key, metric and name read straight from named fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldExtractor {
    pub schema: KeySchema,
    pub metric: &'static [&'static str],
    pub name: &'static [&'static str],
    pub rollup: Rollup,
    pub top_n: Option<usize>,
    /// Keep only records whose field equals the value.
    pub only: Option<(&'static str, &'static str)>,
}

impl FieldExtractor {
    pub fn new(schema: KeySchema, metric: &'static [&'static str], name: &'static [&'static str]) -> Self {
        Self { schema, metric, name, rollup: Rollup::Last, top_n: None, only: None }
    }
}

impl Extractor for FieldExtractor {
    fn key_schema(&self) -> &KeySchema {
        &self.schema
    }

    fn metric<'r>(&self, rec: &'r Record) -> Option<&'r Value> {
        self.metric.iter().find_map(|f| rec.get(*f).filter(|v| !v.is_null()))
    }

    fn name(&self, rec: &Record) -> Option<String> {
        self.name.iter().find_map(|f| text(rec.get(*f))).map(|s| normalize_ws(&s))
    }

    fn keep(&self, rec: &Record) -> bool {
        match self.only {
            Some((field, want)) => text(rec.get(field)).is_some_and(|v| v == want),
            None => true,
        }
    }

    fn rollup(&self) -> Rollup {
        self.rollup
    }

    fn top_n(&self) -> Option<usize> {
        self.top_n
    }
}

/// Counters for everything the normalizer absorbed instead of failing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub input: usize,
    pub filtered: usize,
    pub cut_by_top_n: usize,
    pub skipped_no_key: usize,
    pub missing_key_fields: usize,
    pub missing_names: usize,
    pub coerced_metrics: usize,
}

impl NormalizeReport {
    pub fn degraded(&self) -> usize {
        self.skipped_no_key + self.missing_key_fields + self.missing_names + self.coerced_metrics
    }
}

/// Scalar-ish JSON to text. Null and missing give `None`; nested values are
/// rendered as compact JSON.
pub fn text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Metric coercion. Returns the value and whether it was taken as-is.
/// Negative, fractional-garbage, missing and non-numeric inputs become 0.
pub fn coerce_metric(v: Option<&Value>) -> (MetricValue, bool) {
    match v {
        Some(Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                (u, true)
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f >= 0.0 => (f.trunc() as u64, f.fract() == 0.0),
                    _ => (0, false),
                }
            }
        }
        Some(Value::String(s)) => coerce_str(s),
        _ => (0, false),
    }
}

pub fn coerce_str(raw: &str) -> (MetricValue, bool) {
    let s = raw.trim().replace(',', "");
    if let Ok(u) = s.parse::<u64>() {
        return (u, true);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 => (f.trunc() as u64, f.fract() == 0.0),
        _ => (0, false),
    }
}

/// Turn one cycle's records into a snapshot stamped with `captured_at`'s hour.
pub fn normalize<E: Extractor + ?Sized>(
    ex: &E,
    records: &[Record],
    captured_at: DateTime<Utc>,
) -> (Snapshot, NormalizeReport) {
    let bucket = TimeBucket::floor(captured_at);
    let mut report = NormalizeReport { input: records.len(), ..Default::default() };

    let mut picked: Vec<&Record> = records.iter().filter(|r| ex.keep(r)).collect();
    report.filtered = records.len() - picked.len();

    if let Some(n) = ex.top_n() {
        // stable: equal metrics keep listing order
        picked.sort_by_key(|r| std::cmp::Reverse(coerce_metric(ex.metric(r)).0));
        report.cut_by_top_n = picked.len().saturating_sub(n);
        picked.truncate(n);
    }

    let schema = ex.key_schema();
    let mut observations = Vec::with_capacity(picked.len());
    for rec in picked {
        let raw = ex.key_values(rec);
        let missing = raw.iter().filter(|v| v.is_none()).count();
        report.missing_key_fields += missing;
        let raw: Vec<String> = raw.into_iter().map(Option::unwrap_or_default).collect();

        let Some(key) = schema.key_from(&raw) else {
            report.skipped_no_key += 1;
            logw!("Normalize: record without usable key skipped ({} field(s) missing)", missing);
            continue;
        };

        let (value, clean) = coerce_metric(ex.metric(rec));
        if !clean {
            report.coerced_metrics += 1;
            logw!("Normalize: metric for {key} coerced to {value} (raw={:?})", ex.metric(rec));
        }

        let name = ex.name(rec).unwrap_or_else(|| {
            report.missing_names += 1;
            s!()
        });

        observations.push(Observation { key, bucket, value, name });
    }

    if ex.rollup() == Rollup::Sum {
        observations = sum_by_key(observations);
    }

    (Snapshot::new(observations), report)
}

/// Sum per key, keeping first-appearance order and the last name seen.
fn sum_by_key(obs: Vec<Observation>) -> Vec<Observation> {
    let mut slot: HashMap<EntityKey, usize> = HashMap::new();
    let mut out: Vec<Observation> = Vec::new();
    for o in obs {
        match slot.get(&o.key) {
            Some(&i) => {
                let acc = &mut out[i];
                acc.value = acc.value.saturating_add(o.value);
                if !o.name.is_empty() {
                    acc.name = o.name;
                }
            }
            None => {
                slot.insert(o.key.clone(), out.len());
                out.push(o);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::KeyField;
    use chrono::TimeZone;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn categories() -> FieldExtractor {
        FieldExtractor::new(
            KeySchema::new(vec![KeyField::numeric("category_no", 8)]),
            &["view_cnt"],
            &["category_name"],
        )
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 3, 27, 11).unwrap()
    }

    #[test]
    fn coerces_metric_shapes() {
        assert_eq!(coerce_metric(Some(&json!(12))), (12, true));
        assert_eq!(coerce_metric(Some(&json!("1,204"))), (1204, true));
        assert_eq!(coerce_metric(Some(&json!(" 7 "))), (7, true));
        assert_eq!(coerce_metric(Some(&json!(3.0))), (3, true));
        assert_eq!(coerce_metric(Some(&json!(-4))), (0, false));
        assert_eq!(coerce_metric(Some(&json!("n/a"))), (0, false));
        assert_eq!(coerce_metric(Some(&json!(null))), (0, false));
        assert_eq!(coerce_metric(None), (0, false));
    }

    #[test]
    fn one_bucket_for_the_whole_batch_and_defaults_for_gaps() {
        let records = vec![
            rec(json!({"category_no": 40070, "category_name": "버추얼", "view_cnt": "10"})),
            rec(json!({"category_no": "00810000", "view_cnt": "oops"})),
        ];
        let (snap, report) = normalize(&categories(), &records, at());
        assert_eq!(snap.buckets().len(), 1);
        assert_eq!(snap.observations[0].bucket.label(), "2024-01-01T03:00:00Z");
        assert_eq!(snap.observations[0].key, EntityKey::single("00040070"));
        assert_eq!(snap.observations[1].value, 0);
        assert_eq!(snap.observations[1].name, "");
        assert_eq!(report.coerced_metrics, 1);
        assert_eq!(report.missing_names, 1);
    }

    #[test]
    fn keyless_records_are_skipped_not_fatal() {
        let records = vec![
            rec(json!({"view_cnt": 5})),
            rec(json!({"category_no": "1", "view_cnt": 5})),
        ];
        let (snap, report) = normalize(&categories(), &records, at());
        assert_eq!(snap.len(), 1);
        assert_eq!(report.skipped_no_key, 1);
    }

    #[test]
    fn empty_input_is_an_empty_snapshot() {
        let (snap, report) = normalize(&categories(), &[], at());
        assert!(snap.is_empty());
        assert_eq!(report, NormalizeReport::default());
    }

    #[test]
    fn sum_rollup_uses_aliases_and_filter() {
        let mut ex = FieldExtractor::new(
            KeySchema::new(vec![
                KeyField::text("categoryType"),
                KeyField::text("categoryId").with_aliases(&["liveCategory"]),
            ]),
            &["concurrentUserCount"],
            &["liveCategoryValue"],
        );
        ex.rollup = Rollup::Sum;
        ex.only = Some(("categoryType", "GAME"));
        let records = vec![
            rec(json!({"categoryType": "GAME", "liveCategory": "lol", "concurrentUserCount": 10})),
            rec(json!({"categoryType": "ETC", "liveCategory": "talk", "concurrentUserCount": 99})),
            rec(json!({"categoryType": "GAME", "liveCategory": "lol", "concurrentUserCount": 5, "liveCategoryValue": "LoL"})),
        ];
        let (snap, report) = normalize(&ex, &records, at());
        assert_eq!(report.filtered, 1);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.observations[0].value, 15);
        assert_eq!(snap.observations[0].name, "LoL");
    }

    #[test]
    fn top_n_keeps_the_largest() {
        let mut ex = categories();
        ex.top_n = Some(2);
        let records = vec![
            rec(json!({"category_no": "1", "view_cnt": 5})),
            rec(json!({"category_no": "2", "view_cnt": 50})),
            rec(json!({"category_no": "3", "view_cnt": 20})),
        ];
        let (snap, report) = normalize(&ex, &records, at());
        let keys: Vec<String> = snap.observations.iter().map(|o| o.key.label()).collect();
        assert_eq!(keys, row!["00000002", "00000003"]);
        assert_eq!(report.cut_by_top_n, 1);
    }
}
