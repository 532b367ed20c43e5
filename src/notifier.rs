//! End-to-end outbound entry point: registry lookup, unit construction, and
//! hand-off to the delivery pipeline.

use std::collections::HashSet;
use std::sync::Arc;

use crate::matching::build_dispatch_units;
use crate::models::Notification;
use crate::pipeline::DeliveryPipeline;
use crate::registry::SubscriptionRegistry;

/// Fans locally raised notifications out to matching subscriber endpoints.
#[derive(Clone)]
pub struct Notifier {
    registry: Arc<dyn SubscriptionRegistry>,
    pipeline: DeliveryPipeline,
}

impl Notifier {
    /// Create a notifier over a subscription registry and a pipeline.
    pub fn new(registry: Arc<dyn SubscriptionRegistry>, pipeline: DeliveryPipeline) -> Self {
        Self { registry, pipeline }
    }

    /// Dispatch a batch of notifications to every matching endpoint.
    ///
    /// Fire-and-forget: registry failures are logged, and delivery outcomes
    /// surface through the pipeline's sink.
    pub async fn notify(&self, notifications: Vec<Notification>) {
        if notifications.is_empty() {
            return;
        }

        let actions: HashSet<String> = notifications.iter().map(|n| n.action.clone()).collect();

        let endpoints = match self.registry.query(&actions).await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                tracing::error!(
                    target: "hook_delivery",
                    error = %e,
                    "Failed to query matching subscriptions"
                );
                return;
            }
        };

        if endpoints.is_empty() {
            tracing::debug!(
                target: "hook_delivery",
                notification_count = notifications.len(),
                "No active subscriptions match the fired actions"
            );
            return;
        }

        let units = build_dispatch_units(&endpoints, &notifications);

        tracing::info!(
            target: "hook_delivery",
            notification_count = notifications.len(),
            endpoint_count = endpoints.len(),
            unit_count = units.len(),
            "Dispatching notifications to matching endpoints"
        );

        self.pipeline.dispatch(units).await;
    }
}
