//! Pagination-until-empty driver shared by the search and metadata phases.

use log::{debug, warn};
use serde_json::Value;
use std::time::Duration;

use crate::adapters::{Endpoint, PageRequest};
use crate::engine::channel::ProgressReporter;
use crate::engine::state::RunState;
use crate::engine::tools::records_at;
use crate::engine::transport::{Clock, RawResponse, Transport};
use crate::utils::config::HttpConsts;
use crate::{CollectError, CollectResult, ResultTable};

/// Retry and backoff knobs.
#[derive(Clone, Debug)]
pub struct FetchOptions {
    /// Cap on consecutive 429 retries for one request. `None` retries until the limit clears.
    pub max_rate_limit_retries: Option<u32>,
    /// Wait used when a 429 carries no usable `RateLimit-Reset` header.
    pub default_backoff_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: None,
            default_backoff_secs: HttpConsts::DEFAULT_BACKOFF_SECS,
        }
    }
}

/// Borrowed view of everything a fetch needs. Cheap to build per phase.
pub struct PagedFetcher<'a> {
    transport: &'a dyn Transport,
    clock: &'a dyn Clock,
    state: &'a RunState,
    reporter: &'a ProgressReporter,
    options: &'a FetchOptions,
}

impl<'a> PagedFetcher<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        clock: &'a dyn Clock,
        state: &'a RunState,
        reporter: &'a ProgressReporter,
        options: &'a FetchOptions,
    ) -> Self {
        Self {
            transport,
            clock,
            state,
            reporter,
            options,
        }
    }

    pub fn reporter(&self) -> &'a ProgressReporter {
        self.reporter
    }

    /// Fetch every page of `endpoint` until a page unwraps to no records (or the cursor
    /// scheme has no next page). Rows are tagged with the page they came from.
    pub fn fetch(&self, endpoint: &Endpoint, label: &str) -> CollectResult<ResultTable> {
        let mut table = ResultTable::new();
        let mut cursor = endpoint.first_cursor();
        loop {
            self.state.ensure_running()?;
            let page_number = cursor.page_number();
            self.reporter.page(format!("{label} page {page_number}"));
            let request = endpoint.request_for(&cursor);
            let response = self.send(&request)?;
            if endpoint.ends_on(response.status) {
                debug!("{label}: status {} ends the listing", response.status);
                break;
            }
            let body = decode(&request, response)?;
            let page = endpoint.parse(&cursor, &body);
            if page.records.is_empty() {
                debug!("{label}: page {page_number} empty, done");
                break;
            }
            table.append_page(page.records, page_number, &endpoint.echo);
            match page.next {
                Some(next) => cursor = next,
                None => break,
            }
        }
        Ok(table)
    }

    /// One GET whose payload at `unwrap_path` (object or array) becomes the rows. Used for
    /// per-object metadata; the caller reports progress for the object.
    pub fn fetch_single(&self, request: &PageRequest, unwrap_path: &[String]) -> CollectResult<ResultTable> {
        let body = self.request_json(request)?;
        Ok(ResultTable::from_rows(records_at(&body, unwrap_path)))
    }

    /// Issue `request`, waiting out rate limits, and decode the JSON body.
    pub fn request_json(&self, request: &PageRequest) -> CollectResult<Value> {
        let response = self.send(request)?;
        decode(request, response)
    }

    /// Issue `request` until it is not rate limited. Any other status is returned as is.
    ///
    /// The run flag is checked before every attempt and before every backoff sleep.
    fn send(&self, request: &PageRequest) -> CollectResult<RawResponse> {
        let mut retries: u32 = 0;
        loop {
            self.state.ensure_running()?;
            let response = self.transport.get(request)?;
            if response.status != HttpConsts::RATE_LIMITED {
                return Ok(response);
            }
            if let Some(max) = self.options.max_rate_limit_retries
                && retries >= max
            {
                return Err(CollectError::RateLimitExhausted {
                    url: request.url.clone(),
                    retries,
                });
            }
            retries += 1;
            let wait = self.backoff_for(&response);
            warn!("{}: rate limited, retrying in {}s", request.url, wait.as_secs());
            self.reporter.message("Rate limit hit, waiting for request...");
            self.state.ensure_running()?;
            self.clock.sleep(wait);
        }
    }

    /// `RateLimit-Reset - now`, floored at zero. Falls back to the default backoff when the
    /// header is missing or not an integer timestamp.
    pub fn backoff_for(&self, response: &RawResponse) -> Duration {
        let reset = response
            .header(HttpConsts::RATE_LIMIT_RESET_HEADER)
            .and_then(|value| value.trim().parse::<i64>().ok());
        match reset {
            Some(reset) => {
                let secs = (reset - self.clock.now_unix()).max(0);
                Duration::from_secs(secs as u64)
            }
            None => Duration::from_secs(self.options.default_backoff_secs),
        }
    }
}

/// Fail on non-2xx statuses, then parse the body as JSON.
fn decode(request: &PageRequest, response: RawResponse) -> CollectResult<Value> {
    if !response.is_success() {
        return Err(CollectError::Http {
            url: request.url.clone(),
            params: request.params.clone(),
            headers: request.headers.clone(),
            status: response.status,
            body: response.body,
        });
    }
    serde_json::from_str(&response.body).map_err(|source| CollectError::Decode {
        url: request.url.clone(),
        params: request.params.clone(),
        headers: request.headers.clone(),
        status: response.status,
        source,
    })
}
