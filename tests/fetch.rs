// tests/fetch.rs
use std::cell::RefCell;

use ranksnap::config::Credentials;
use ranksnap::core::net::{Request, RetryPolicy, Transport};
use ranksnap::fetch::Fetcher;
use ranksnap::progress::NullProgress;
use ranksnap::specs::{ChzzkLives, SoopCategoryList};
use ranksnap::Error;

/// Scripted transport: answers from a closure and records every request.
struct Scripted<F: Fn(&Request, usize) -> Result<String, String>> {
    answer: F,
    seen: RefCell<Vec<String>>,
}

impl<F: Fn(&Request, usize) -> Result<String, String>> Scripted<F> {
    fn new(answer: F) -> Self {
        Self { answer, seen: RefCell::new(Vec::new()) }
    }

    fn calls(&self) -> usize {
        self.seen.borrow().len()
    }
}

impl<F: Fn(&Request, usize) -> Result<String, String>> Transport for Scripted<F> {
    fn get(&self, req: &Request) -> Result<String, String> {
        let n = self.calls();
        self.seen.borrow_mut().push(req.describe());
        (self.answer)(req, n)
    }
}

fn creds() -> Credentials {
    Credentials { client_id: "id".into(), client_secret: "secret".into() }
}

#[test]
fn soop_pages_until_more_flag_drops() {
    let t = Scripted::new(|req: &Request, _: usize| {
        let page = req.query_value("nPageNo").unwrap_or("?").to_string();
        let more = page != "3";
        Ok(format!(r#"{{"data":{{"list":[{{"category_no":"{page}"}}],"is_more":{more}}}}}"#))
    });
    let recs = Fetcher::new(&t)
        .unpaced()
        .collect(&SoopCategoryList, &mut NullProgress)
        .unwrap();
    assert_eq!(recs.len(), 3);
    assert_eq!(t.calls(), 3);
}

#[test]
fn chzzk_stops_on_a_repeated_cursor() {
    let t = Scripted::new(|_: &Request, n: usize| {
        // the server keeps handing out the same token
        Ok(format!(r#"{{"content":{{"data":[{{"channelId":"c{n}"}}],"page":{{"next":"same"}}}}}}"#))
    });
    let recs = Fetcher::new(&t)
        .unpaced()
        .collect(&ChzzkLives::new(creds()), &mut NullProgress)
        .unwrap();
    assert_eq!(recs.len(), 2);
    assert!(t.seen.borrow()[1].contains("next=same"));
}

#[test]
fn page_limit_bounds_a_runaway_listing() {
    let t = Scripted::new(|_: &Request, _: usize| Ok(r#"{"data":{"list":[{"a":1}],"is_more":true}}"#.to_string()));
    let recs = Fetcher::new(&t)
        .unpaced()
        .with_max_pages(4)
        .collect(&SoopCategoryList, &mut NullProgress)
        .unwrap();
    assert_eq!(recs.len(), 4);
}

#[test]
fn transient_failures_and_bad_bodies_are_retried() {
    let t = Scripted::new(|_: &Request, n: usize| match n {
        0 => Err("connection reset".to_string()),
        1 => Ok("<html>maintenance</html>".to_string()),
        _ => Ok(r#"{"data":{"list":[{"category_no":"1"}],"is_more":false}}"#.to_string()),
    });
    let recs = Fetcher::new(&t)
        .with_retry(RetryPolicy::immediate(5))
        .unpaced()
        .collect(&SoopCategoryList, &mut NullProgress)
        .unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(t.calls(), 3);
}

#[test]
fn exhausted_retries_fail_the_whole_listing() {
    let t = Scripted::new(|req: &Request, _: usize| {
        if req.query_value("nPageNo") == Some("1") {
            Ok(r#"{"data":{"list":[{"category_no":"1"}],"is_more":true}}"#.to_string())
        } else {
            Err("HTTP 503".to_string())
        }
    });
    let out = Fetcher::new(&t)
        .with_retry(RetryPolicy::immediate(3))
        .unpaced()
        .collect(&SoopCategoryList, &mut NullProgress);
    match out {
        Err(Error::Transport { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(t.calls(), 4);
}
