//! WebHook dispatch and receiving for event-driven integrations.
//!
//! Provides an outbound notification dispatch pipeline with HMAC-SHA256
//! signing, bounded concurrency, per-unit retry schedules, and terminal
//! outcome classification, plus an inbound receiver surface that verifies
//! provider signatures over verbatim request bodies.

pub mod crypto;
pub mod error;
pub mod matching;
pub mod models;
pub mod notifier;
pub mod pipeline;
pub mod receivers;
pub mod registry;
pub mod router;
pub mod secrets;
pub mod sink;
pub mod validation;

pub use crypto::{HmacAlgorithm, SignatureEncoding};
pub use error::{ApiResult, HookError};
pub use matching::build_dispatch_units;
pub use models::{DeliveryOutcome, DispatchUnit, Notification, SubscriberEndpoint};
pub use notifier::Notifier;
pub use pipeline::{DeliveryPipeline, DispatchConfig};
pub use receivers::{BodyFormat, ReceiverConfig, ReceiverRegistry, SignatureScheme};
pub use registry::{InMemoryRegistry, SubscriptionRegistry};
pub use router::{incoming_router, IncomingHandler, ReceiverState, SecurityPolicy};
pub use secrets::{InMemorySecretStore, SecretStore};
pub use sink::{OutcomeSink, TracingSink};
