//! Shared fixtures: scripted transport, fake clock, a minimal adapter, body builders.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use curator::adapters::{
    Adapter, CursorScheme, Dimensions, Endpoint, MetadataRef, MetadataSource, PageRequest,
};
use curator::engine::channel::{ProgressReceiver, ProgressReporter, progress_channel};
use curator::engine::merger::JoinKey;
use curator::engine::progress::ProgressObserver;
use curator::engine::transport::{Clock, RawResponse, Transport};
use curator::{CollectError, CollectResult, ProgressEvent, ProgressMode, Query, ResultTable};

pub const SEARCH_URL: &str = "https://repo.test/search";
pub const RECORD_URL: &str = "https://repo.test/records";

type Handler = Box<dyn Fn(&PageRequest, usize) -> RawResponse + Send>;

/// Transport answering from a closure. The closure gets the request and the number of
/// earlier calls. Every request is recorded in a shared log.
pub struct MockTransport {
    handler: Handler,
    calls: Arc<Mutex<Vec<PageRequest>>>,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&PageRequest, usize) -> RawResponse + Send + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the call log that stays valid after the transport is boxed and moved.
    pub fn calls(&self) -> Arc<Mutex<Vec<PageRequest>>> {
        Arc::clone(&self.calls)
    }
}

impl Transport for MockTransport {
    fn get(&self, request: &PageRequest) -> CollectResult<RawResponse> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push(request.clone());
        drop(calls);
        Ok((self.handler)(request, index))
    }
}

/// Clock frozen at `now`; sleeps are recorded, not slept.
#[derive(Clone)]
pub struct FakeClock {
    pub now: i64,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl FakeClock {
    pub fn new(now: i64) -> Self {
        Self {
            now,
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Clock for FakeClock {
    fn now_unix(&self) -> i64 {
        self.now
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Term-only adapter over `SEARCH_URL?q=<term>&page=<n>`, records under `items`.
/// With metadata enabled, each `id` is fetched from `RECORD_URL/<id>` and joined on `id`.
#[derive(Default)]
pub struct TestAdapter {
    pub with_metadata: bool,
    pub metadata_unavailable: bool,
}

impl TestAdapter {
    pub fn search_only() -> Self {
        Self::default()
    }

    pub fn with_metadata() -> Self {
        Self {
            with_metadata: true,
            metadata_unavailable: false,
        }
    }
}

impl Adapter for TestAdapter {
    fn name(&self) -> &str {
        "test"
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions::Terms
    }

    fn search_endpoint(&self, query: &Query) -> CollectResult<Endpoint> {
        let term = query
            .term()
            .ok_or_else(|| CollectError::Validation("term required".into()))?;
        let request = PageRequest::new(SEARCH_URL).param("q", term);
        Ok(Endpoint::new(request, CursorScheme::page("page", 1)).unwrap(&["items"]))
    }

    fn metadata(&self) -> Option<&dyn MetadataSource> {
        if self.with_metadata { Some(self) } else { None }
    }
}

impl MetadataSource for TestAdapter {
    fn derive_refs(&self, _query: &Query, table: &ResultTable) -> CollectResult<Vec<MetadataRef>> {
        if self.metadata_unavailable {
            return Err(CollectError::Capability("records endpoint offline".into()));
        }
        Ok(table
            .column_values("id")
            .map(|id| {
                let id = id.to_string();
                MetadataRef::single(id.clone(), PageRequest::new(format!("{RECORD_URL}/{id}")))
            })
            .collect())
    }

    fn join_key(&self) -> JoinKey {
        JoinKey::on("id")
    }
}

/// `{"items": [{"id": start, "title": "record <id>"}, ...]}` with `count` items.
pub fn items_body(start: u64, count: u64) -> String {
    let items: Vec<Value> = (start..start + count)
        .map(|id| json!({"id": id, "title": format!("record {id}")}))
        .collect();
    json!({ "items": items }).to_string()
}

pub fn ok(body: impl Into<String>) -> RawResponse {
    RawResponse::new(200, body)
}

pub fn param<'a>(request: &'a PageRequest, name: &str) -> Option<&'a str> {
    request.get_param(name)
}

pub fn reporter() -> (ProgressReporter, ProgressReceiver) {
    let (sender, receiver) = progress_channel();
    (ProgressReporter::new(sender), receiver)
}

pub fn messages(events: &[ProgressEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| e.message().map(str::to_string))
        .collect()
}

/// Observer that records what it was shown.
#[derive(Default)]
pub struct RecordingObserver {
    pub messages: Vec<String>,
    pub progress: Vec<(String, ProgressMode, Option<usize>, Option<usize>)>,
    pub finished: bool,
}

impl ProgressObserver for RecordingObserver {
    fn on_message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }

    fn on_progress(
        &mut self,
        current_ref: &str,
        mode: ProgressMode,
        completed: Option<usize>,
        total: Option<usize>,
    ) {
        self.progress
            .push((current_ref.to_string(), mode, completed, total));
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}
