//! Concurrent WebHook delivery engine.
//!
//! Each dispatch unit runs as its own task: serialize the payload once, sign
//! it, then POST with a bounded retry schedule. A semaphore caps the number
//! of in-flight HTTP attempts; retry sleeps do not hold a permit, so a unit
//! waiting on its backoff never starves other units.
//!
//! Every unit produces exactly one terminal [`DeliveryOutcome`]:
//! - 2xx response => `Delivered`
//! - 410 response => `Gone`, regardless of remaining retry budget
//! - anything else (non-2xx status, timeout, transport error) is retryable
//!   until the schedule is exhausted, then `Failed`

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::crypto;
use crate::error::HookError;
use crate::models::{DeliveryOutcome, DispatchUnit, Notification};
use crate::sink::OutcomeSink;

/// Header carrying the hex HMAC-SHA256 signature of the request body.
pub const SIGNATURE_HEADER: &str = "X-Hook-Signature";
/// Header carrying the dispatch unit id, stable across retries.
pub const UNIT_ID_HEADER: &str = "X-Hook-Id";
/// Header carrying the zero-based attempt offset of the current attempt.
pub const ATTEMPT_HEADER: &str = "X-Hook-Attempt";

/// Delivery pipeline configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Backoff schedule: N delays allow up to N+1 total attempts. Empty
    /// means send once with no retries.
    pub retry_delays: Vec<Duration>,
    /// Upper bound on simultaneous in-flight HTTP attempts.
    pub max_concurrency: usize,
    /// Timeout applied to each HTTP attempt.
    pub request_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            retry_delays: vec![Duration::from_secs(60), Duration::from_secs(240)],
            max_concurrency: 4,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl DispatchConfig {
    /// Set the retry schedule.
    #[must_use]
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Set the in-flight attempt bound.
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Reject configurations that would deadlock or never complete.
    fn validate(&self) -> Result<(), HookError> {
        if self.max_concurrency == 0 {
            return Err(HookError::Configuration(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(HookError::Configuration(
                "request_timeout must be non-zero".to_string(),
            ));
        }
        if self.retry_delays.iter().any(Duration::is_zero) {
            return Err(HookError::Configuration(
                "retry delays must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Classification of a single HTTP attempt.
enum AttemptClass {
    Success(u16),
    Gone,
    Retryable(String),
}

/// JSON body delivered to subscriber endpoints. Serialized once per unit so
/// the signature stays valid across retries.
#[derive(Serialize)]
struct DispatchPayload<'a> {
    id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    notifications: &'a [Notification],
}

struct PipelineInner {
    client: Client,
    retry_delays: Vec<Duration>,
    semaphore: Arc<Semaphore>,
    sink: Arc<dyn OutcomeSink>,
    shutdown: CancellationToken,
    tasks: Mutex<JoinSet<()>>,
}

/// Concurrent delivery engine for dispatch units.
#[derive(Clone)]
pub struct DeliveryPipeline {
    inner: Arc<PipelineInner>,
}

impl DeliveryPipeline {
    /// Create a pipeline with a shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `HookError::Configuration` for an invalid config and
    /// `HookError::Internal` if the HTTP client cannot be built.
    pub fn new(config: DispatchConfig, sink: Arc<dyn OutcomeSink>) -> Result<Self, HookError> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("hookrelay/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| HookError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(PipelineInner {
                client,
                retry_delays: config.retry_delays,
                semaphore: Arc::new(Semaphore::new(config.max_concurrency)),
                sink,
                shutdown: CancellationToken::new(),
                tasks: Mutex::new(JoinSet::new()),
            }),
        })
    }

    /// Queue dispatch units for delivery. Fire-and-forget: outcomes surface
    /// through the [`OutcomeSink`], not a return value.
    ///
    /// Units handed in after [`shutdown`](Self::shutdown) are dropped.
    pub async fn dispatch(&self, units: Vec<DispatchUnit>) {
        if self.inner.shutdown.is_cancelled() {
            tracing::warn!(
                target: "hook_delivery",
                dropped = units.len(),
                "Pipeline is shut down, dropping dispatch units"
            );
            return;
        }

        let mut tasks = self.inner.tasks.lock().await;

        // Reap tasks that already finished so the set stays bounded.
        while tasks.try_join_next().is_some() {}

        for unit in units {
            let inner = Arc::clone(&self.inner);
            tasks.spawn(run_unit(inner, unit));
        }
    }

    /// Stop accepting new units and cancel pending retry timers and permit
    /// waits. In-flight HTTP attempts run to completion or their timeout;
    /// abandoned units emit no terminal outcome.
    pub fn shutdown(&self) {
        tracing::info!(target: "hook_delivery", "Pipeline shutdown requested");
        self.inner.shutdown.cancel();
        self.inner.semaphore.close();
    }

    /// Wait for all spawned unit tasks to finish.
    pub async fn join(&self) {
        let mut tasks = self.inner.tasks.lock().await;
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(target: "hook_delivery", error = %e, "Dispatch task panicked");
            }
        }
    }
}

/// Drive one dispatch unit through the retry state machine.
async fn run_unit(inner: Arc<PipelineInner>, mut unit: DispatchUnit) {
    let payload = DispatchPayload {
        id: unit.id,
        created_at: unit.created_at,
        notifications: &unit.notifications,
    };
    let body = match serde_json::to_vec(&payload) {
        Ok(b) => b,
        Err(e) => {
            // Serialization failure is a deployment defect, not a transient
            // condition; fail immediately without touching the network.
            let outcome = DeliveryOutcome::Failed {
                reason: format!("Failed to serialize payload: {e}"),
            };
            inner.sink.record(unit.id, &outcome, unit.attempt_offset);
            return;
        }
    };
    let signature = crypto::sign_body(&unit.endpoint.secret, &body);

    loop {
        let permit = tokio::select! {
            () = inner.shutdown.cancelled() => {
                abandon(&unit);
                return;
            }
            permit = inner.semaphore.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => {
                    abandon(&unit);
                    return;
                }
            },
        };

        let class = attempt(&inner.client, &unit, &body, &signature).await;
        drop(permit);

        match class {
            AttemptClass::Success(status) => {
                let outcome = DeliveryOutcome::Delivered { status };
                inner.sink.record(unit.id, &outcome, unit.attempt_offset);
                return;
            }
            AttemptClass::Gone => {
                // 410 signals the endpoint is permanently retired; it wins
                // over any remaining retry budget.
                inner
                    .sink
                    .record(unit.id, &DeliveryOutcome::Gone, unit.attempt_offset);
                return;
            }
            AttemptClass::Retryable(reason) => {
                let used = unit.attempt_offset as usize;
                if used < inner.retry_delays.len() {
                    let delay = inner.retry_delays[used];
                    unit.attempt_offset += 1;
                    inner.sink.retrying(unit.id, unit.attempt_offset, delay);
                    tracing::debug!(
                        target: "hook_delivery",
                        unit_id = %unit.id,
                        endpoint_id = %unit.endpoint.id,
                        attempt_offset = unit.attempt_offset,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "Delivery attempt failed, retrying"
                    );
                    tokio::select! {
                        () = inner.shutdown.cancelled() => {
                            abandon(&unit);
                            return;
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                } else {
                    let outcome = DeliveryOutcome::Failed { reason };
                    inner.sink.record(unit.id, &outcome, unit.attempt_offset);
                    return;
                }
            }
        }
    }
}

/// Issue a single HTTP POST attempt and classify the result.
async fn attempt(
    client: &Client,
    unit: &DispatchUnit,
    body: &[u8],
    signature: &str,
) -> AttemptClass {
    let mut request = client.post(&unit.endpoint.callback_url);

    for (name, value) in &unit.endpoint.headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let result = request
        .header("Content-Type", "application/json")
        .header(UNIT_ID_HEADER, unit.id.to_string())
        .header(ATTEMPT_HEADER, unit.attempt_offset.to_string())
        .header(SIGNATURE_HEADER, format!("sha256={signature}"))
        .body(body.to_vec())
        .send()
        .await;

    match result {
        Ok(response) => {
            let status = response.status();
            if status.is_success() {
                AttemptClass::Success(status.as_u16())
            } else if status == StatusCode::GONE {
                AttemptClass::Gone
            } else {
                AttemptClass::Retryable(format!("HTTP {}", status.as_u16()))
            }
        }
        Err(e) => {
            let reason = if e.is_timeout() {
                "Request timed out".to_string()
            } else if e.is_connect() {
                format!("Connection failed: {e}")
            } else {
                format!("Request error: {e}")
            };
            AttemptClass::Retryable(reason)
        }
    }
}

fn abandon(unit: &DispatchUnit) {
    tracing::debug!(
        target: "hook_delivery",
        unit_id = %unit.id,
        attempt_offset = unit.attempt_offset,
        "Abandoning dispatch unit on shutdown"
    );
}
