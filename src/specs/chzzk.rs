// src/specs/chzzk.rs
//! CHZZK open API live listing.
//!
//! Envelope: `{ "content": { "data": [...], "page": { "next": "..." } } }`.
//! Paging is token based; the request carries client credentials as headers.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::{Cursor, ListingSpec, Page, objects};
use crate::config::Credentials;
use crate::config::consts::*;
use crate::core::net::Request;

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    data: Option<Vec<Value>>,
    #[serde(default)]
    page: Option<PageInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct PageInfo {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ChzzkLives {
    credentials: Credentials,
}

impl ChzzkLives {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl ListingSpec for ChzzkLives {
    fn name(&self) -> String {
        s!("chzzk lives")
    }

    fn first(&self) -> Cursor {
        Cursor::Token(None)
    }

    fn request(&self, cursor: &Cursor) -> Request {
        let mut req = Request::get(CHZZK_API, Duration::from_secs(CHZZK_TIMEOUT_SECS))
            .query("size", CHZZK_PAGE_SIZE)
            .header("Client-Id", &self.credentials.client_id)
            .header("Client-Secret", &self.credentials.client_secret)
            .header("Content-Type", "application/json");
        if let Cursor::Token(Some(t)) = cursor {
            req = req.query("next", t);
        }
        req
    }

    /// A missing or blank token ends the listing. Repeated tokens are
    /// caught by the fetch loop.
    fn parse(&self, body: &str, cursor: &Cursor) -> Result<Page, String> {
        let env: Envelope = serde_json::from_str(body).map_err(|e| format!("lives: bad JSON: {e}"))?;
        let content = env.content.unwrap_or_default();
        let (records, dropped) = objects(content.data.unwrap_or_default());
        if dropped > 0 {
            logw!("Spec: chzzk lives {}: {dropped} non-object item(s) ignored", cursor.describe());
        }
        let next = content
            .page
            .and_then(|p| p.next)
            .filter(|t| !t.trim().is_empty())
            .map(|t| Cursor::Token(Some(t)));
        Ok(Page { records, next })
    }

    fn pause(&self) -> Duration {
        Duration::from_millis(CHZZK_PAUSE_MS)
    }
}
