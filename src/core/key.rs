// src/core/key.rs
//
// Row identity. A key is one or more canonical string fields; numeric ids are
// zero-padded per field so "40070", 40070 and "40070.0" all land on one row.

use std::cmp::Ordering;
use std::fmt;

/// Separator used when a composite key must live in a single cell (roster files).
pub const KEY_LABEL_SEP: char = '|';

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyField {
    /// Header written for this field.
    pub column: &'static str,
    /// Other header spellings accepted on load (and record field names on input).
    pub aliases: &'static [&'static str],
    /// Zero-pad purely numeric values to this width.
    pub pad: Option<usize>,
}

impl KeyField {
    pub const fn text(column: &'static str) -> Self {
        Self { column, aliases: &[], pad: None }
    }

    pub const fn numeric(column: &'static str, width: usize) -> Self {
        Self { column, aliases: &[], pad: Some(width) }
    }

    pub const fn with_aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn matches_header(&self, header: &str) -> bool {
        let h = header.trim();
        h.eq_ignore_ascii_case(self.column) || self.aliases.iter().any(|a| h.eq_ignore_ascii_case(a))
    }

    pub fn normalize(&self, raw: &str) -> String {
        let s = raw.trim();
        let Some(width) = self.pad else { return s.to_string() };
        match integral(s) {
            Some(n) => format!("{n:0width$}"),
            None => s.to_string(),
        }
    }
}

/// `"123"`, `"123.0"`, `"1.23e2"` -> 123. Anything else, negatives included, is not an id.
fn integral(s: &str) -> Option<u64> {
    if s.is_empty() {
        return None;
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok();
    }
    let f: f64 = s.parse().ok()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySchema {
    fields: Vec<KeyField>,
    /// Descriptive columns older tables carried next to the key; dropped on load.
    ignored: &'static [&'static str],
}

impl KeySchema {
    pub fn new(fields: Vec<KeyField>) -> Self {
        assert!(!fields.is_empty(), "a key needs at least one field");
        Self { fields, ignored: &[] }
    }

    pub fn ignoring(mut self, columns: &'static [&'static str]) -> Self {
        self.ignored = columns;
        self
    }

    pub fn fields(&self) -> &[KeyField] {
        &self.fields
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    pub fn headers(&self) -> Vec<String> {
        self.fields.iter().map(|f| s!(f.column)).collect()
    }

    pub fn is_ignored(&self, header: &str) -> bool {
        let h = header.trim();
        self.ignored.iter().any(|c| h.eq_ignore_ascii_case(c))
    }

    /// Normalize raw field values into a key. `None` if every field is blank.
    pub fn key_from<S: AsRef<str>>(&self, raw: &[S]) -> Option<EntityKey> {
        let parts: Vec<String> = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| raw.get(i).map(|r| f.normalize(r.as_ref())).unwrap_or_default())
            .collect();
        let key = EntityKey(parts);
        (!key.is_blank()).then_some(key)
    }

    /// Inverse of `EntityKey::label`; the last field takes any surplus separators.
    pub fn key_from_label(&self, label: &str) -> Option<EntityKey> {
        let parts: Vec<&str> = label.splitn(self.arity(), KEY_LABEL_SEP).collect();
        self.key_from(&parts)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityKey(Vec<String>);

impl EntityKey {
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self(fields.into_iter().map(Into::into).collect())
    }

    pub fn single(field: impl Into<String>) -> Self {
        Self(vec![field.into()])
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|f| f.trim().is_empty())
    }

    /// Single-cell form, fields joined by `|`.
    pub fn label(&self) -> String {
        self.0.join(&KEY_LABEL_SEP.to_string())
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Digit strings compare as numbers (then textually, so "01" and "1" stay
/// distinct); numbers sort before text; text compares bytewise.
fn cmp_field(a: &str, b: &str) -> Ordering {
    match (digits(a), digits(b)) {
        (Some(x), Some(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn digits(s: &str) -> Option<&str> {
    (!s.is_empty() && s.bytes().all(|c| c.is_ascii_digit())).then(|| s.trim_start_matches('0'))
}

impl Ord for EntityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(&other.0) {
            match cmp_field(a, b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

impl PartialOrd for EntityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
