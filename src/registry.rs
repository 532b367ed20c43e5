//! Subscription registry: the store of subscriber endpoints the dispatch
//! core matches against.
//!
//! Persistent backends live behind the [`SubscriptionRegistry`] trait; the
//! crate ships an in-memory implementation with registration-time
//! validation.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::HookError;
use crate::models::SubscriberEndpoint;
use crate::validation;

/// Yields the set of active endpoints whose filters intersect a batch of
/// actions.
#[async_trait]
pub trait SubscriptionRegistry: Send + Sync {
    /// Return active endpoints matching any of the given actions.
    async fn query(&self, actions: &HashSet<String>) -> Result<Vec<SubscriberEndpoint>, HookError>;
}

/// In-memory registry keyed by endpoint id.
#[derive(Default)]
pub struct InMemoryRegistry {
    endpoints: RwLock<HashMap<String, SubscriberEndpoint>>,
    allow_http: bool,
}

impl InMemoryRegistry {
    /// Create an empty registry requiring HTTPS callback URLs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow HTTP callback URLs (for development/testing).
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Register or replace an endpoint after validating its callback URL,
    /// secret length, and filter set.
    pub async fn insert(&self, endpoint: SubscriberEndpoint) -> Result<(), HookError> {
        validation::validate_callback_url(&endpoint.callback_url, self.allow_http)?;
        validation::validate_secret(&endpoint.secret)?;
        validation::validate_filters(&endpoint.filters)?;

        let mut endpoints = self.endpoints.write().await;
        endpoints.insert(endpoint.id.clone(), endpoint);
        Ok(())
    }

    /// Remove an endpoint. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        self.endpoints.write().await.remove(id).is_some()
    }

    /// Number of registered endpoints (active or not).
    pub async fn len(&self) -> usize {
        self.endpoints.read().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.endpoints.read().await.is_empty()
    }
}

#[async_trait]
impl SubscriptionRegistry for InMemoryRegistry {
    async fn query(&self, actions: &HashSet<String>) -> Result<Vec<SubscriberEndpoint>, HookError> {
        let endpoints = self.endpoints.read().await;
        let mut matched: Vec<SubscriberEndpoint> = endpoints
            .values()
            .filter(|ep| ep.is_active && actions.iter().any(|a| ep.matches(a)))
            .cloned()
            .collect();
        // HashMap iteration order is arbitrary; keep results stable.
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matched)
    }
}
