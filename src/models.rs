//! Core value types for WebHook dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Filter value that matches every notification action.
pub const WILDCARD_FILTER: &str = "*";

/// A single fired event: an action name plus an opaque payload.
///
/// The dispatch core never interprets `data`; it is serialized verbatim into
/// the delivery body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Non-empty event identifier, e.g. `"user.created"`.
    pub action: String,
    /// Arbitrary application data carried with the event.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Notification {
    /// Create a new notification.
    pub fn new(action: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            action: action.into(),
            data,
        }
    }
}

/// A registered external URL that wants to receive outbound notifications.
///
/// Read-only to the dispatch core; created and mutated only by the
/// registration side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberEndpoint {
    /// Unique per subscriber.
    pub id: String,
    /// Absolute `http`/`https` callback URL.
    pub callback_url: String,
    /// 32-64 character signing secret shared with the receiver.
    pub secret: String,
    /// Action names this endpoint wants, or the `"*"` wildcard. Non-empty.
    pub filters: Vec<String>,
    /// Extra headers added to every delivery.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Inactive endpoints are excluded from matching.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl SubscriberEndpoint {
    /// Whether this endpoint's filters match the given action.
    ///
    /// `"*"` matches everything; otherwise the match is exact and
    /// case-sensitive.
    #[must_use]
    pub fn matches(&self, action: &str) -> bool {
        self.filters
            .iter()
            .any(|f| f == WILDCARD_FILTER || f == action)
    }
}

/// One scheduled delivery sequence targeting one endpoint for one batch of
/// notifications.
///
/// `id`, `endpoint`, and `notifications` are fixed at construction; only
/// `attempt_offset` changes, and only from the pipeline task that owns the
/// unit.
#[derive(Debug, Clone)]
pub struct DispatchUnit {
    /// Unique per unit, stable across retries.
    pub id: Uuid,
    /// Target endpoint (shared, never mutated by the unit).
    pub endpoint: Arc<SubscriberEndpoint>,
    /// Notifications batched for this endpoint, in original firing order.
    pub notifications: Vec<Notification>,
    /// Zero-based count of attempts already made.
    pub attempt_offset: u32,
    /// When the unit was built; carried in the delivery body.
    pub created_at: DateTime<Utc>,
}

impl DispatchUnit {
    /// Create a new dispatch unit with a fresh id and zero attempts made.
    #[must_use]
    pub fn new(endpoint: Arc<SubscriberEndpoint>, notifications: Vec<Notification>) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint,
            notifications,
            attempt_offset: 0,
            created_at: Utc::now(),
        }
    }
}

/// Terminal classification of one dispatch unit. Produced exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The endpoint acknowledged the delivery with a 2xx status.
    Delivered { status: u16 },
    /// The endpoint returned HTTP 410; it is permanently retired.
    Gone,
    /// The retry schedule was exhausted, or the payload could not be built.
    Failed { reason: String },
}

impl DeliveryOutcome {
    /// Stable string label for logs and sinks.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered { .. } => "delivered",
            Self::Gone => "gone",
            Self::Failed { .. } => "failed",
        }
    }
}
