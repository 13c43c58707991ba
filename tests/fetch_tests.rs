//! PagedFetcher: termination, provenance, rate-limit backoff, error context, cancellation.

mod common;

use common::{FakeClock, MockTransport, SEARCH_URL, items_body, ok, param, reporter};
use curator::adapters::{CursorScheme, Endpoint, PageRequest};
use curator::engine::fetcher::{FetchOptions, PagedFetcher};
use curator::engine::state::RunState;
use curator::engine::transport::RawResponse;
use curator::{CollectError, PAGE_COLUMN, ProgressEvent, ProgressMode};
use serde_json::json;
use std::time::Duration;

fn search_endpoint() -> Endpoint {
    let request = PageRequest::new(SEARCH_URL).param("q", "cats");
    Endpoint::new(request, CursorScheme::page("page", 1)).unwrap(&["items"])
}

/// Pages 1..=3 return 10, 5, 0 records.
fn three_pages(request: &PageRequest, _: usize) -> RawResponse {
    match param(request, "page") {
        Some("1") => ok(items_body(0, 10)),
        Some("2") => ok(items_body(10, 5)),
        _ => ok(items_body(0, 0)),
    }
}

// --- pagination ---

#[test]
fn test_fetch_stops_at_first_empty_page() {
    let transport = MockTransport::new(three_pages);
    let calls = transport.calls();
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    let table = fetcher.fetch(&search_endpoint(), "cats").unwrap();

    assert_eq!(table.len(), 15);
    assert_eq!(calls.lock().unwrap().len(), 3);
    let pages: Vec<u64> = table
        .column_values(PAGE_COLUMN)
        .map(|v| v.as_u64().unwrap())
        .collect();
    assert_eq!(pages.iter().filter(|p| **p == 1).count(), 10);
    assert_eq!(pages.iter().filter(|p| **p == 2).count(), 5);
}

#[test]
fn test_fetch_empty_first_page_returns_empty_table() {
    let transport = MockTransport::new(|_, _| ok(json!({"items": []}).to_string()));
    let calls = transport.calls();
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    let table = fetcher.fetch(&search_endpoint(), "cats").unwrap();
    assert!(table.is_empty());
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[test]
fn test_fetch_missing_unwrap_path_counts_as_empty() {
    let transport = MockTransport::new(|_, _| ok(json!({"other": [1, 2]}).to_string()));
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    assert!(fetcher.fetch(&search_endpoint(), "cats").unwrap().is_empty());
}

#[test]
fn test_fetch_offset_scheme_advances_by_page_size() {
    let transport = MockTransport::new(|request, _| match param(request, "start") {
        Some("0") | Some("2") => ok(json!({"data": {"items": [{"a": 1}, {"a": 2}]}}).to_string()),
        _ => ok(json!({"data": {"items": []}}).to_string()),
    });
    let calls = transport.calls();
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);
    let endpoint = Endpoint::new(PageRequest::new(SEARCH_URL), CursorScheme::offset("start", 2))
        .unwrap(&["data", "items"]);

    let table = fetcher.fetch(&endpoint, "offsets").unwrap();

    assert_eq!(table.len(), 4);
    let starts: Vec<String> = calls
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.get_param("start").unwrap().to_string())
        .collect();
    assert_eq!(starts, vec!["0", "2", "4"]);
    // Offset pages are tagged with their 1-based index.
    assert_eq!(table.rows()[3][PAGE_COLUMN], json!(2));
}

#[test]
fn test_fetch_path_cursor_and_end_status() {
    let base = "https://repo.test/task/list/limit/2";
    let transport = MockTransport::new(move |request, _| {
        if request.url == format!("{base}/offset/0") {
            ok(json!({"tasks": {"task": [{"task_id": 1}, {"task_id": 2}]}}).to_string())
        } else if request.url == format!("{base}/offset/2") {
            ok(json!({"tasks": {"task": [{"task_id": 3}]}}).to_string())
        } else {
            RawResponse::new(412, r#"{"error": {"code": "372", "message": "No results"}}"#)
        }
    });
    let calls = transport.calls();
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);
    let endpoint = Endpoint::new(PageRequest::new(base), CursorScheme::offset("offset", 2))
        .cursor_in_path()
        .unwrap(&["tasks", "task"])
        .end_on_status(412);

    let table = fetcher.fetch(&endpoint, "tasks").unwrap();

    assert_eq!(table.len(), 3);
    let urls: Vec<String> = calls.lock().unwrap().iter().map(|r| r.url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{base}/offset/0"),
            format!("{base}/offset/2"),
            format!("{base}/offset/4"),
        ]
    );
    assert!(calls.lock().unwrap().iter().all(|r| r.params.is_empty()));
    assert_eq!(table.rows()[2][PAGE_COLUMN], json!(2));
}

#[test]
fn test_end_status_is_fatal_when_not_declared() {
    let transport = MockTransport::new(|_, _| RawResponse::new(412, "No results"));
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    let err = fetcher.fetch(&search_endpoint(), "cats").unwrap_err();
    assert!(matches!(err, CollectError::Http { status: 412, .. }));
}

fn first_letter(record: &curator::Record) -> serde_json::Value {
    record["title"]
        .as_str()
        .and_then(|t| t.chars().next())
        .map_or(serde_json::Value::Null, |c| json!(c.to_string()))
}

#[test]
fn test_derived_columns_are_computed_per_row() {
    let transport = MockTransport::new(three_pages);
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);
    let endpoint = search_endpoint().derive("initial", first_letter);

    let table = fetcher.fetch(&endpoint, "cats").unwrap();

    assert_eq!(table.len(), 15);
    assert!(table.column_values("initial").all(|v| v == &json!("r")));
}

#[test]
fn test_fetch_token_scheme_stops_without_next_token() {
    let transport = MockTransport::new(|request, _| match param(request, "cursor") {
        None => ok(json!({"results": [{"a": 1}], "next": "abc"}).to_string()),
        Some("abc") => ok(json!({"results": [{"a": 2}], "next": null}).to_string()),
        Some(_) => RawResponse::new(500, "unexpected"),
    });
    let calls = transport.calls();
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);
    let endpoint = Endpoint::new(
        PageRequest::new(SEARCH_URL),
        CursorScheme::token("cursor", &["next"]),
    )
    .unwrap(&["results"]);

    let table = fetcher.fetch(&endpoint, "tokens").unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[test]
fn test_fetch_appends_echo_columns() {
    let transport = MockTransport::new(three_pages);
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);
    let endpoint = search_endpoint().echo("publish_query", "1950-01-01");

    let table = fetcher.fetch(&endpoint, "cats").unwrap();
    assert!(
        table
            .column_values("publish_query")
            .all(|v| v == &json!("1950-01-01"))
    );
    assert_eq!(table.column_values("publish_query").count(), 15);
}

#[test]
fn test_fetch_reports_indeterminate_page_progress() {
    let transport = MockTransport::new(three_pages);
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    fetcher.fetch(&search_endpoint(), "cats").unwrap();

    let refs: Vec<String> = rx
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            ProgressEvent::Progress {
                current_ref, mode, ..
            } => {
                assert_eq!(mode, ProgressMode::Indeterminate);
                Some(current_ref)
            }
            ProgressEvent::Message(_) => None,
        })
        .collect();
    assert_eq!(refs, vec!["cats page 1", "cats page 2", "cats page 3"]);
}

// --- rate limiting ---

#[test]
fn test_rate_limit_sleeps_until_reset_then_retries_same_request() {
    let transport = MockTransport::new(|request, index| {
        if index == 0 {
            RawResponse::new(429, "slow down").with_header("RateLimit-Reset", "1030")
        } else {
            three_pages(request, index)
        }
    });
    let calls = transport.calls();
    let clock = FakeClock::new(1000);
    let state = RunState::new();
    let (reporter, rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    let table = fetcher.fetch(&search_endpoint(), "cats").unwrap();

    assert_eq!(table.len(), 15);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(30)]);
    let calls = calls.lock().unwrap();
    assert_eq!(calls[0], calls[1]);
    assert!(
        rx.drain()
            .iter()
            .any(|e| e.message() == Some("Rate limit hit, waiting for request..."))
    );
}

#[test]
fn test_rate_limit_reset_in_the_past_sleeps_zero() {
    let transport = MockTransport::new(|request, index| {
        if index == 0 {
            RawResponse::new(429, "").with_header("ratelimit-reset", "900")
        } else {
            three_pages(request, index)
        }
    });
    let clock = FakeClock::new(1000);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    fetcher.fetch(&search_endpoint(), "cats").unwrap();
    assert_eq!(clock.sleeps(), vec![Duration::ZERO]);
}

#[test]
fn test_rate_limit_without_header_uses_default_backoff() {
    let transport = MockTransport::new(|request, index| {
        if index == 0 {
            RawResponse::new(429, "")
        } else {
            three_pages(request, index)
        }
    });
    let clock = FakeClock::new(1000);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions {
        default_backoff_secs: 7,
        ..FetchOptions::default()
    };
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    fetcher.fetch(&search_endpoint(), "cats").unwrap();
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(7)]);
}

#[test]
fn test_rate_limit_retry_cap_is_enforced() {
    let transport = MockTransport::new(|_, _| RawResponse::new(429, "").with_header("RateLimit-Reset", "0"));
    let calls = transport.calls();
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions {
        max_rate_limit_retries: Some(3),
        ..FetchOptions::default()
    };
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    let err = fetcher.fetch(&search_endpoint(), "cats").unwrap_err();
    assert!(matches!(err, CollectError::RateLimitExhausted { retries: 3, .. }));
    assert_eq!(calls.lock().unwrap().len(), 4);
    assert_eq!(clock.sleeps().len(), 3);
}

// --- errors ---

#[test]
fn test_non_success_status_is_fatal_with_request_context() {
    let transport = MockTransport::new(|_, _| RawResponse::new(503, "maintenance"));
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);
    let mut endpoint = search_endpoint();
    endpoint.request = endpoint
        .request
        .headers(&[("Authorization".to_string(), "token s3cret".to_string())]);

    let err = fetcher.fetch(&endpoint, "cats").unwrap_err();
    match &err {
        CollectError::Http {
            url, params, status, ..
        } => {
            assert_eq!(url, SEARCH_URL);
            assert_eq!(*status, 503);
            assert!(params.contains(&("q".to_string(), "cats".to_string())));
        }
        other => panic!("expected Http error, got {other:?}"),
    }
    let text = err.to_string();
    assert!(text.contains("503"));
    assert!(text.contains(SEARCH_URL));
    assert!(!text.contains("s3cret"));
}

#[test]
fn test_undecodable_body_is_fatal() {
    let transport = MockTransport::new(|_, _| ok("<html>not json</html>"));
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    let err = fetcher.fetch(&search_endpoint(), "cats").unwrap_err();
    assert!(matches!(err, CollectError::Decode { status: 200, .. }));
}

#[test]
fn test_fetch_single_turns_object_into_one_row() {
    let transport = MockTransport::new(|_, _| ok(json!({"id": 7, "size": 3}).to_string()));
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    let table = fetcher
        .fetch_single(&PageRequest::new("https://repo.test/records/7"), &[])
        .unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows()[0]["size"], json!(3));
}

#[test]
fn test_fetch_single_unwraps_and_leaves_progress_to_caller() {
    let transport =
        MockTransport::new(|_, _| ok(json!({"task": {"task_id": "4", "name": "iris"}}).to_string()));
    let clock = FakeClock::new(0);
    let state = RunState::new();
    let (reporter, rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    let table = fetcher
        .fetch_single(&PageRequest::new("https://repo.test/task/4"), &["task".to_string()])
        .unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows()[0]["name"], json!("iris"));
    assert!(rx.drain().is_empty());
}

// --- cancellation ---

#[test]
fn test_stopped_state_issues_no_request() {
    let transport = MockTransport::new(three_pages);
    let calls = transport.calls();
    let clock = FakeClock::new(0);
    let state = RunState::new();
    state.request_stop();
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    let err = fetcher.fetch(&search_endpoint(), "cats").unwrap_err();
    assert!(err.is_cancelled());
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_stop_between_pages_prevents_next_request() {
    let state = RunState::new();
    let stopper = state.clone();
    let transport = MockTransport::new(move |request, index| {
        stopper.request_stop();
        three_pages(request, index)
    });
    let calls = transport.calls();
    let clock = FakeClock::new(0);
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    let err = fetcher.fetch(&search_endpoint(), "cats").unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[test]
fn test_stop_during_rate_limit_skips_sleep() {
    let state = RunState::new();
    let stopper = state.clone();
    let transport = MockTransport::new(move |_, _| {
        stopper.request_stop();
        RawResponse::new(429, "").with_header("RateLimit-Reset", "100")
    });
    let clock = FakeClock::new(0);
    let (reporter, _rx) = reporter();
    let options = FetchOptions::default();
    let fetcher = PagedFetcher::new(&transport, &clock, &state, &reporter, &options);

    let err = fetcher.fetch(&search_endpoint(), "cats").unwrap_err();
    assert!(err.is_cancelled());
    assert!(clock.sleeps().is_empty());
}
