// src/specs/soop.rs
//! SOOP search API (`api.php`): category list and per-category live list.
//!
//! Both share one envelope, `{ "data": { "list": [...], "is_more": ... } }`,
//! and page by number starting at 1.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::{Cursor, ListingSpec, Page, objects, truthy};
use crate::config::consts::*;
use crate::core::net::Request;

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Data>,
}

#[derive(Debug, Default, Deserialize)]
struct Data {
    #[serde(default)]
    list: Option<Vec<Value>>,
    #[serde(default)]
    is_more: Value,
}

fn parse_envelope(what: &str, body: &str, cursor: &Cursor) -> Result<Page, String> {
    let env: Envelope = serde_json::from_str(body).map_err(|e| format!("{what}: bad JSON: {e}"))?;
    let data = env.data.unwrap_or_default();
    let (records, dropped) = objects(data.list.unwrap_or_default());
    if dropped > 0 {
        logw!("Spec: {what} {}: {dropped} non-object list item(s) ignored", cursor.describe());
    }
    let next = match cursor {
        Cursor::Page(n) if truthy(&data.is_more) => Some(Cursor::Page(n + 1)),
        _ => None,
    };
    Ok(Page { records, next })
}

fn page_no(cursor: &Cursor) -> u32 {
    match cursor {
        Cursor::Page(n) => *n,
        Cursor::Token(_) => 1,
    }
}

fn base(timeout_secs: u64) -> Request {
    Request::get(SOOP_API, Duration::from_secs(timeout_secs))
        .header("Accept", "application/json, text/plain, */*")
        .header("Referer", SOOP_REFERER)
}

/// All categories ordered by viewers.
#[derive(Clone, Debug, Default)]
pub struct SoopCategoryList;

impl ListingSpec for SoopCategoryList {
    fn name(&self) -> String {
        s!("soop categoryList")
    }

    fn first(&self) -> Cursor {
        Cursor::Page(1)
    }

    fn request(&self, cursor: &Cursor) -> Request {
        base(SOOP_TIMEOUT_SECS)
            .query("m", "categoryList")
            .query("szKeyword", "")
            .query("szOrder", "view_cnt")
            .query("nPageNo", page_no(cursor))
            .query("nListCnt", SOOP_CATEGORY_PAGE_SIZE)
            .query("nOffset", 0)
            .query("szPlatform", "pc")
    }

    fn parse(&self, body: &str, cursor: &Cursor) -> Result<Page, String> {
        parse_envelope("categoryList", body, cursor)
    }

    fn pause(&self) -> Duration {
        Duration::from_millis(SOOP_CATEGORY_PAUSE_MS)
    }
}

/// Live broadcasts inside one category.
#[derive(Clone, Debug)]
pub struct SoopCategoryContents {
    pub cate_no: String,
}

impl SoopCategoryContents {
    pub fn new(cate_no: impl Into<String>) -> Self {
        Self { cate_no: cate_no.into() }
    }
}

impl ListingSpec for SoopCategoryContents {
    fn name(&self) -> String {
        format!("soop categoryContentsList {}", self.cate_no)
    }

    fn first(&self) -> Cursor {
        Cursor::Page(1)
    }

    fn request(&self, cursor: &Cursor) -> Request {
        base(SOOP_TIMEOUT_SECS)
            .query("m", "categoryContentsList")
            .query("szType", "live")
            .query("nPageNo", page_no(cursor))
            .query("nListCnt", SOOP_CONTENTS_PAGE_SIZE)
            .query("szPlatform", "pc")
            .query("szOrder", "view_cnt_desc")
            .query("szCateNo", &self.cate_no)
    }

    fn parse(&self, body: &str, cursor: &Cursor) -> Result<Page, String> {
        parse_envelope("categoryContentsList", body, cursor)
    }

    fn pause(&self) -> Duration {
        Duration::from_millis(SOOP_CONTENTS_PAUSE_MS)
    }
}
