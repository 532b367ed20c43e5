//! Pairing of subscriber endpoints with the notifications they should
//! receive.
//!
//! Pure matching only: no I/O and no mutation of inputs. Each active
//! endpoint whose filters match at least one notification yields exactly one
//! [`DispatchUnit`] containing only its matching notifications, in the
//! original firing order.

use std::sync::Arc;

use crate::models::{DispatchUnit, Notification, SubscriberEndpoint};

/// Build one dispatch unit per endpoint that matches any notification.
///
/// Inactive endpoints and endpoints matching zero notifications produce no
/// unit. Notification order within a unit follows the input order.
#[must_use]
pub fn build_dispatch_units(
    endpoints: &[SubscriberEndpoint],
    notifications: &[Notification],
) -> Vec<DispatchUnit> {
    let mut units = Vec::new();

    for endpoint in endpoints {
        if !endpoint.is_active {
            continue;
        }

        let matched: Vec<Notification> = notifications
            .iter()
            .filter(|n| endpoint.matches(&n.action))
            .cloned()
            .collect();

        if matched.is_empty() {
            continue;
        }

        units.push(DispatchUnit::new(Arc::new(endpoint.clone()), matched));
    }

    units
}
