//! Common test utilities for hookrelay integration tests.
//!
//! Provides wiremock responders, a collecting outcome sink, and fixture
//! helpers for exercising the dispatch pipeline against mock endpoints.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;
use wiremock::{Request, Respond, ResponseTemplate};

use hookrelay::{DeliveryOutcome, Notification, OutcomeSink, SubscriberEndpoint};

/// Standard test secret (32 chars, within the allowed range).
pub const SECRET: &str = "whsec_test_secret_key_1234567890";

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Build an active endpoint pointing at a mock server URL.
pub fn endpoint(id: &str, url: &str, filters: &[&str]) -> SubscriberEndpoint {
    SubscriberEndpoint {
        id: id.to_string(),
        callback_url: url.to_string(),
        secret: SECRET.to_string(),
        filters: filters.iter().map(|s| (*s).to_string()).collect(),
        headers: HashMap::new(),
        is_active: true,
    }
}

/// Build a notification with a small JSON payload.
pub fn notification(action: &str) -> Notification {
    Notification::new(action, serde_json::json!({ "source": "test" }))
}

// ---------------------------------------------------------------------------
// CollectingSink - records terminal outcomes and retry signals
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SinkState {
    terminals: Vec<(Uuid, DeliveryOutcome, u32)>,
    retries: Vec<(Uuid, u32)>,
}

/// Outcome sink that collects everything for later assertions.
#[derive(Clone, Default)]
pub struct CollectingSink {
    state: Arc<Mutex<SinkState>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All terminal outcomes recorded so far.
    pub fn terminals(&self) -> Vec<(Uuid, DeliveryOutcome, u32)> {
        self.state.lock().unwrap().terminals.clone()
    }

    /// Number of terminal outcomes recorded.
    pub fn terminal_count(&self) -> usize {
        self.state.lock().unwrap().terminals.len()
    }

    /// Number of retry signals recorded.
    pub fn retry_count(&self) -> usize {
        self.state.lock().unwrap().retries.len()
    }

    /// The terminal outcome for a specific unit, if recorded.
    pub fn terminal_for(&self, unit_id: Uuid) -> Option<(DeliveryOutcome, u32)> {
        self.state
            .lock()
            .unwrap()
            .terminals
            .iter()
            .find(|(id, _, _)| *id == unit_id)
            .map(|(_, outcome, offset)| (outcome.clone(), *offset))
    }
}

impl OutcomeSink for CollectingSink {
    fn record(&self, unit_id: Uuid, outcome: &DeliveryOutcome, attempt_offset: u32) {
        self.state
            .lock()
            .unwrap()
            .terminals
            .push((unit_id, outcome.clone(), attempt_offset));
    }

    fn retrying(&self, unit_id: Uuid, attempt_offset: u32, _delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .retries
            .push((unit_id, attempt_offset));
    }
}

/// Poll until `predicate` holds or `timeout` elapses. Panics on timeout.
pub async fn wait_until(timeout: Duration, predicate: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !predicate() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ---------------------------------------------------------------------------
// CaptureResponder - captures requests and returns a fixed status
// ---------------------------------------------------------------------------

/// A captured HTTP request with body and headers.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl CapturedRequest {
    /// Parse the body as JSON.
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("captured body is not JSON")
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v.as_str())
    }
}

/// A wiremock responder that captures incoming requests.
#[derive(Clone)]
pub struct CaptureResponder {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    response_code: u16,
}

impl CaptureResponder {
    /// Capture requests and return 200 OK.
    pub fn new() -> Self {
        Self::with_status(200)
    }

    /// Capture requests and return a custom status code.
    pub fn with_status(status: u16) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            response_code: status,
        }
    }

    /// All captured requests.
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of captured requests.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for CaptureResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl Respond for CaptureResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let captured = CapturedRequest {
            body: request.body.clone(),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect(),
        };
        self.requests.lock().unwrap().push(captured);
        ResponseTemplate::new(self.response_code)
    }
}

// ---------------------------------------------------------------------------
// CountingResponder - counts requests
// ---------------------------------------------------------------------------

/// A wiremock responder that counts incoming requests.
#[derive(Clone)]
pub struct CountingResponder {
    count: Arc<AtomicU32>,
    response_code: u16,
}

impl CountingResponder {
    /// Count requests and return 200 OK.
    pub fn new() -> Self {
        Self::with_status(200)
    }

    /// Count requests and return a custom status code.
    pub fn with_status(status: u16) -> Self {
        Self {
            count: Arc::new(AtomicU32::new(0)),
            response_code: status,
        }
    }

    /// Current request count.
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }
}

impl Default for CountingResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl Respond for CountingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.count.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(self.response_code)
    }
}

// ---------------------------------------------------------------------------
// SequenceResponder - scripted status codes per attempt
// ---------------------------------------------------------------------------

/// A wiremock responder that returns a scripted sequence of status codes,
/// repeating the last one once the script runs out.
#[derive(Clone)]
pub struct SequenceResponder {
    attempt: Arc<AtomicU32>,
    statuses: Vec<u16>,
}

impl SequenceResponder {
    pub fn new(statuses: Vec<u16>) -> Self {
        assert!(!statuses.is_empty());
        Self {
            attempt: Arc::new(AtomicU32::new(0)),
            statuses,
        }
    }

    /// Fail `n` times with 500, then return 200.
    pub fn fail_times(n: usize) -> Self {
        let mut statuses = vec![500; n];
        statuses.push(200);
        Self::new(statuses)
    }

    /// Number of attempts observed so far.
    pub fn attempt_count(&self) -> u32 {
        self.attempt.load(Ordering::SeqCst)
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.attempt.fetch_add(1, Ordering::SeqCst) as usize;
        let status = *self.statuses.get(n).unwrap_or(
            self.statuses
                .last()
                .expect("sequence responder has at least one status"),
        );
        ResponseTemplate::new(status)
    }
}

// ---------------------------------------------------------------------------
// DelayedResponder - adds response delay
// ---------------------------------------------------------------------------

/// A wiremock responder that delays before responding.
#[derive(Clone)]
pub struct DelayedResponder {
    delay_ms: u64,
    response_code: u16,
}

impl DelayedResponder {
    /// Delay `ms` milliseconds, then return 200 OK.
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            response_code: 200,
        }
    }

    /// Delay with a custom status code.
    pub fn with_status(delay_ms: u64, response_code: u16) -> Self {
        Self {
            delay_ms,
            response_code,
        }
    }
}

impl Respond for DelayedResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(self.response_code)
            .set_delay(Duration::from_millis(self.delay_ms))
    }
}
