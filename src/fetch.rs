// src/fetch.rs
//
// Pagination driver. Walks a listing from its first cursor until the spec
// reports no next page, retrying each page as a unit (request + parse).
// Either every page arrives or the whole fetch fails; callers never see a
// partial listing.

use std::collections::HashSet;
use std::thread;

use crate::config::consts::MAX_PAGES;
use crate::core::net::{RetryPolicy, Transport};
use crate::error::Result;
use crate::normalize::Record;
use crate::progress::Progress;
use crate::specs::ListingSpec;

pub struct Fetcher<'t, T: Transport + ?Sized> {
    transport: &'t T,
    retry: RetryPolicy,
    max_pages: u32,
    paced: bool,
}

impl<'t, T: Transport + ?Sized> Fetcher<'t, T> {
    pub fn new(transport: &'t T) -> Self {
        Self { transport, retry: RetryPolicy::default(), max_pages: MAX_PAGES, paced: true }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Skip the courtesy pause between pages.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    pub fn collect<L: ListingSpec + ?Sized>(&self, spec: &L, progress: &mut dyn Progress) -> Result<Vec<Record>> {
        let name = spec.name();
        let mut records: Vec<Record> = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = spec.first();
        let mut pages = 0u32;

        loop {
            let req = spec.request(&cursor);
            let what = req.describe();
            let page = self.retry.run(&what, || {
                let body = self.transport.get(&req)?;
                spec.parse(&body, &cursor)
            })?;
            pages += 1;
            logd!("Fetch: {name} {} -> {} record(s)", cursor.describe(), page.records.len());
            records.extend(page.records);

            let Some(next) = page.next else { break };
            if !seen.insert(next.clone()) {
                logw!("Fetch: {name} repeated cursor {}; stopping", next.describe());
                break;
            }
            if pages >= self.max_pages {
                logw!("Fetch: {name} hit the {} page limit; stopping", self.max_pages);
                break;
            }
            if self.paced {
                thread::sleep(spec.pause());
            }
            cursor = next;
        }

        logf!("Fetch: {name} done, {} record(s) over {pages} page(s)", records.len());
        progress.log(&format!("{name}: {} record(s), {pages} page(s)", records.len()));
        Ok(records)
    }
}
