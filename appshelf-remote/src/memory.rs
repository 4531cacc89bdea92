//! In-memory transport with scripted responses.
//!
//! Responses are keyed by method and URL. Several responses may be queued
//! for one key; they are served in order and the last one repeats. Unknown
//! URLs answer 404. Every request is recorded so callers can assert on
//! ordering.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::time::Duration;

use crate::error::FetchError;
use crate::fetch::{Fetch, FetchRequest, FetchResponse, Method};

#[derive(Debug, Clone)]
enum Scripted {
    Respond { status: u16, body: Vec<u8> },
    Fail,
}

#[derive(Debug, Default)]
struct Script {
    responses: HashMap<(Method, String), VecDeque<Scripted>>,
    log: Vec<(Method, String)>,
}

/// A [`Fetch`] implementation that never touches the network.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    script: Mutex<Script>,
    delay: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response for `method url`.
    pub fn respond(
        &self,
        method: Method,
        url: impl Into<String>,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) {
        self.push(
            method,
            url.into(),
            Scripted::Respond {
                status,
                body: body.into(),
            },
        );
    }

    /// Queue the same response for both HEAD and GET.
    pub fn respond_any(&self, url: impl Into<String>, status: u16) {
        let url = url.into();
        self.respond(Method::Head, url.clone(), status, Vec::new());
        self.respond(Method::Get, url, status, Vec::new());
    }

    /// Queue a connection failure for `method url`.
    pub fn fail(&self, method: Method, url: impl Into<String>) {
        self.push(method, url.into(), Scripted::Fail);
    }

    /// Queue a connection failure for both HEAD and GET.
    pub fn fail_any(&self, url: impl Into<String>) {
        let url = url.into();
        self.fail(Method::Head, url.clone());
        self.fail(Method::Get, url);
    }

    /// Every request served so far, in arrival order.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.lock().log.clone()
    }

    /// Number of requests served for `url` (any method).
    pub fn count(&self, url: &str) -> usize {
        self.lock().log.iter().filter(|(_, u)| u == url).count()
    }

    fn push(&self, method: Method, url: String, scripted: Scripted) {
        self.lock()
            .responses
            .entry((method, url))
            .or_default()
            .push_back(scripted);
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(&self, request: &FetchRequest) -> Option<Scripted> {
        let mut script = self.lock();
        script.log.push((request.method, request.url.clone()));
        let queue = script
            .responses
            .get_mut(&(request.method, request.url.clone()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Fetch for MemoryFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let scripted = self.next_response(&request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match scripted {
            Some(Scripted::Respond { status, body }) => Ok(FetchResponse { status, body }),
            Some(Scripted::Fail) => Err(FetchError::Connect(format!(
                "{}: scripted failure",
                request.url
            ))),
            None => Ok(FetchResponse {
                status: 404,
                body: Vec::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_url_is_not_found() {
        let fetcher = MemoryFetcher::new();
        let resp = fetcher.fetch(FetchRequest::get("https://a/b")).await.unwrap();
        assert_eq!(resp.status, 404);
        assert_eq!(fetcher.requests(), vec![(Method::Get, "https://a/b".to_string())]);
    }

    #[tokio::test]
    async fn queued_responses_then_last_repeats() {
        let fetcher = MemoryFetcher::new();
        fetcher.fail(Method::Get, "https://a/b");
        fetcher.respond(Method::Get, "https://a/b", 200, b"ok".to_vec());

        assert!(fetcher.fetch(FetchRequest::get("https://a/b")).await.is_err());
        let resp = fetcher.fetch(FetchRequest::get("https://a/b")).await.unwrap();
        assert_eq!(resp.body, b"ok");
        let resp = fetcher.fetch(FetchRequest::get("https://a/b")).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(fetcher.count("https://a/b"), 3);
    }
}
