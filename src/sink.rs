//! Observability sink for delivery outcomes.
//!
//! The pipeline reports exactly one terminal outcome per dispatch unit and a
//! non-terminal retrying signal before each scheduled retry. Sinks are
//! fire-and-forget: the pipeline never awaits them.

use std::time::Duration;

use uuid::Uuid;

use crate::models::DeliveryOutcome;

/// Receives terminal classifications and retry signals from the pipeline.
pub trait OutcomeSink: Send + Sync {
    /// Record the terminal outcome for a unit. Called exactly once per unit
    /// that runs to completion; `attempt_offset` equals the number of
    /// attempts made beyond the first.
    fn record(&self, unit_id: Uuid, outcome: &DeliveryOutcome, attempt_offset: u32);

    /// Record a non-terminal retry signal: attempt `attempt_offset` will run
    /// after `delay`.
    fn retrying(&self, unit_id: Uuid, attempt_offset: u32, delay: Duration);
}

/// Default sink that logs outcomes through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl OutcomeSink for TracingSink {
    fn record(&self, unit_id: Uuid, outcome: &DeliveryOutcome, attempt_offset: u32) {
        match outcome {
            DeliveryOutcome::Delivered { status } => {
                tracing::info!(
                    target: "hook_delivery",
                    unit_id = %unit_id,
                    status = status,
                    attempt_offset = attempt_offset,
                    "WebHook delivered"
                );
            }
            DeliveryOutcome::Gone => {
                tracing::warn!(
                    target: "hook_delivery",
                    unit_id = %unit_id,
                    attempt_offset = attempt_offset,
                    "WebHook endpoint is gone"
                );
            }
            DeliveryOutcome::Failed { reason } => {
                tracing::warn!(
                    target: "hook_delivery",
                    unit_id = %unit_id,
                    attempt_offset = attempt_offset,
                    reason = %reason,
                    "WebHook delivery failed"
                );
            }
        }
    }

    fn retrying(&self, unit_id: Uuid, attempt_offset: u32, delay: Duration) {
        tracing::debug!(
            target: "hook_delivery",
            unit_id = %unit_id,
            attempt_offset = attempt_offset,
            delay_ms = delay.as_millis() as u64,
            "Scheduling WebHook retry"
        );
    }
}
