// src/core/net.rs
//
// Blocking HTTP GET plus a bounded exponential-backoff retry loop.
// One request at a time; every attempt blocks until it completes or times out.

use std::{thread, time::Duration};

use crate::config::consts::{BACKOFF_CAP_MS, BACKOFF_INITIAL_MS, FETCH_ATTEMPTS, USER_AGENT};
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl Request {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self { url: url.into(), query: Vec::new(), headers: Vec::new(), timeout }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((s!(key), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((s!(key), value.into()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// URL with query string, for logs and error messages. Headers are never shown.
    pub fn describe(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let qs: Vec<String> = self.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        join!(&self.url, "?", &qs.join("&"))
    }
}

/// One network attempt. The error is a human-readable reason; retrying is
/// the caller's decision.
pub trait Transport {
    fn get(&self, req: &Request) -> std::result::Result<String, String>;
}

pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new().user_agent(USER_AGENT).build();
        Self { agent }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn get(&self, req: &Request) -> std::result::Result<String, String> {
        let mut call = self.agent.get(&req.url).timeout(req.timeout);
        for (k, v) in &req.query {
            call = call.query(k, v);
        }
        for (k, v) in &req.headers {
            call = call.set(k, v);
        }
        match call.call() {
            Ok(resp) => resp.into_string().map_err(|e| format!("reading body: {e}")),
            Err(ureq::Error::Status(code, resp)) => Err(format!("HTTP {code} {}", resp.status_text())),
            Err(ureq::Error::Transport(err)) => Err(err.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial: Duration,
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: FETCH_ATTEMPTS,
            initial: Duration::from_millis(BACKOFF_INITIAL_MS),
            cap: Duration::from_millis(BACKOFF_CAP_MS),
        }
    }
}

impl RetryPolicy {
    /// Same ceiling, no sleeping. For tests and offline replays.
    pub fn immediate(attempts: u32) -> Self {
        Self { attempts, initial: Duration::ZERO, cap: Duration::ZERO }
    }

    /// Pause after the `attempt`-th failure (1-based): initial * 2^(attempt-1), capped.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial.saturating_mul(factor).min(self.cap)
    }

    /// Run `op` until it succeeds or the ceiling is hit.
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> std::result::Result<T, String>,
    ) -> Result<T> {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(v) => return Ok(v),
                Err(reason) if attempt >= attempts => {
                    loge!("Fetch: giving up on {what} after {attempt} attempt(s): {reason}");
                    return Err(Error::Transport { url: s!(what), attempts: attempt, reason });
                }
                Err(reason) => {
                    let pause = self.delay_after(attempt);
                    logw!("Fetch: attempt {attempt}/{attempts} for {what} failed ({reason}); retrying in {pause:?}");
                    thread::sleep(pause);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn backoff_doubles_then_caps() {
        let p = RetryPolicy::default();
        let secs: Vec<u64> = (1..=6).map(|a| p.delay_after(a).as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 10, 10]);
    }

    #[test]
    fn succeeds_on_a_later_attempt() {
        let calls = Cell::new(0);
        let out = RetryPolicy::immediate(5).run("x", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 { Err(s!("boom")) } else { Ok(7) }
        });
        assert_eq!(out.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn exhaustion_surfaces_a_transport_error() {
        let out: Result<()> = RetryPolicy::immediate(2).run("http://h/p", || Err(s!("refused")));
        match out {
            Err(Error::Transport { attempts, reason, .. }) => {
                assert_eq!(attempts, 2);
                assert_eq!(reason, "refused");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn describe_includes_query_but_not_headers() {
        let r = Request::get("https://h/api", Duration::from_secs(1))
            .query("page", 2)
            .header("Client-Secret", "hidden");
        assert_eq!(r.describe(), "https://h/api?page=2");
    }
}
