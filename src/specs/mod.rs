// src/specs/mod.rs
//! # Listing endpoint specs
//!
//! Each spec describes one paginated listing endpoint: how to build the
//! request for a given cursor, and how to read a response page into raw
//! records plus the cursor of the following page.
//!
//! ## What lives here
//! - Query parameters, headers and timeouts per endpoint.
//! - Envelope parsing with `serde` (tolerant: absent fields default).
//! - The "is there another page" decision for the endpoint's style of
//!   pagination (page numbers with a more-flag, or opaque next tokens).
//!
//! ## What does **not** live here
//! - Retrying, pausing between pages, loop guards: `fetch`.
//! - Deciding what a record means (key, metric, name): `feeds`.
//! - Persistence of any kind.
//!
//! ## Typical call chain
//! ```text
//! runner -> Fetcher::collect(spec) -> spec.request(cursor) -> Transport::get
//!                                  -> spec.parse(body)     -> Page { records, next }
//! ```
//!
//! Specs are testable offline against captured JSON bodies.

pub mod chzzk;
pub mod soop;

use std::time::Duration;

use serde_json::Value;

use crate::core::net::Request;
use crate::normalize::Record;

pub use chzzk::ChzzkLives;
pub use soop::{SoopCategoryContents, SoopCategoryList};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// 1-based page number.
    Page(u32),
    /// Opaque continuation token; `None` for the first page.
    Token(Option<String>),
}

impl Cursor {
    pub fn describe(&self) -> String {
        match self {
            Cursor::Page(n) => format!("page {n}"),
            Cursor::Token(None) => s!("first page"),
            Cursor::Token(Some(t)) => format!("next={t}"),
        }
    }
}

/// One parsed response page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub next: Option<Cursor>,
}

pub trait ListingSpec {
    /// Short name for logs and progress.
    fn name(&self) -> String;

    fn first(&self) -> Cursor;

    fn request(&self, cursor: &Cursor) -> Request;

    /// Read one body. `Err` is treated like a failed attempt and retried.
    fn parse(&self, body: &str, cursor: &Cursor) -> Result<Page, String>;

    /// Courtesy pause between consecutive pages.
    fn pause(&self) -> Duration {
        Duration::ZERO
    }
}

/// Loose truthiness for "more pages" style flags.
pub(crate) fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false") || s.eq_ignore_ascii_case("n"))
        }
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

/// Keep only object entries; anything else in a list is noise.
pub(crate) fn objects(list: Vec<Value>) -> (Vec<Record>, usize) {
    let total = list.len();
    let records: Vec<Record> = list
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(m) => Some(m),
            _ => None,
        })
        .collect();
    let dropped = total - records.len();
    (records, dropped)
}
