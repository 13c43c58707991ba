//! Network and time seams for the fetcher.
//!
//! [`Transport`] returns every HTTP status as a [`RawResponse`]; the status policy (retry on
//! 429, fail on anything else non-2xx) lives in the fetcher. [`Clock`] abstracts "now" and
//! sleeping so the rate-limit backoff can be driven by a fake clock.

use log::debug;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::adapters::PageRequest;
use crate::utils::config::{HttpConsts, PackagePaths};
use crate::{CollectError, CollectResult};

/// Status, headers and body of one response.
#[derive(Clone, Debug, Default)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport: Send {
    /// Issue a GET for `request`. Only failures with no HTTP status are errors.
    fn get(&self, request: &PageRequest) -> CollectResult<RawResponse>;
}

/// Blocking HTTP transport backed by a shared `ureq` agent.
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(HttpConsts::REQUEST_TIMEOUT_SECS))
            .user_agent(PackagePaths::get().user_agent())
            .build();
        Self { agent }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn get(&self, request: &PageRequest) -> CollectResult<RawResponse> {
        let mut call = self.agent.get(&request.url);
        for (name, value) in &request.params {
            call = call.query(name, value);
        }
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }
        debug!("GET {} {:?}", request.url, request.params);

        let response = match call.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => {
                return Err(CollectError::Transport {
                    url: request.url.clone(),
                    message: err.to_string(),
                });
            }
        };

        let status = response.status();
        let headers = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = response.header(&name)?.to_string();
                Some((name, value))
            })
            .collect();
        let body = response
            .into_string()
            .map_err(|err| CollectError::Transport {
                url: request.url.clone(),
                message: format!("read body: {err}"),
            })?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

pub trait Clock: Send {
    /// Seconds since the unix epoch.
    fn now_unix(&self) -> i64;
    fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
