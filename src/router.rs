//! Axum router for inbound provider WebHooks.
//!
//! Exposes `POST /incoming/{receiver}` and `POST /incoming/{receiver}/{id}`.
//! The body is captured as verbatim bytes before any decoding so signature
//! verification covers exactly what the provider signed.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use async_trait::async_trait;

use crate::error::{ApiResult, HookError};
use crate::receivers::ReceiverRegistry;
use crate::secrets::SecretStore;

/// Application callback invoked after a request passes verification.
#[async_trait]
pub trait IncomingHandler: Send + Sync {
    /// Handle a verified inbound WebHook. `id` is empty when the request hit
    /// the id-less route; `body` is the verbatim request bytes.
    async fn on_event(&self, receiver: &str, id: &str, body: Bytes) -> Result<(), HookError>;
}

/// Transport security policy for inbound requests.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    /// Require HTTPS unless the request comes from localhost. Disable only
    /// as a documented escape hatch for development.
    pub require_https: bool,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            require_https: true,
        }
    }
}

/// Shared state for receiver handlers.
#[derive(Clone)]
pub struct ReceiverState {
    registry: Arc<ReceiverRegistry>,
    secrets: Arc<dyn SecretStore>,
    handler: Arc<dyn IncomingHandler>,
    security: SecurityPolicy,
}

impl ReceiverState {
    /// Create receiver state with the default security policy.
    pub fn new(
        registry: ReceiverRegistry,
        secrets: Arc<dyn SecretStore>,
        handler: Arc<dyn IncomingHandler>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            secrets,
            handler,
            security: SecurityPolicy::default(),
        }
    }

    /// Override the security policy.
    #[must_use]
    pub fn with_security(mut self, security: SecurityPolicy) -> Self {
        self.security = security;
        self
    }
}

/// Build the inbound receiver router.
pub fn incoming_router(state: ReceiverState) -> Router {
    Router::new()
        .route("/incoming/:receiver", post(handle_incoming_root))
        .route("/incoming/:receiver/:id", post(handle_incoming_with_id))
        .with_state(state)
}

async fn handle_incoming_root(
    State(state): State<ReceiverState>,
    Path(receiver): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<StatusCode> {
    process_incoming(&state, &receiver, "", &params, &headers, body).await
}

async fn handle_incoming_with_id(
    State(state): State<ReceiverState>,
    Path((receiver, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<StatusCode> {
    process_incoming(&state, &receiver, &id, &params, &headers, body).await
}

async fn process_incoming(
    state: &ReceiverState,
    receiver: &str,
    id: &str,
    params: &HashMap<String, String>,
    headers: &HeaderMap,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let config = state
        .registry
        .get(receiver)
        .ok_or_else(|| HookError::UnknownReceiver(receiver.to_string()))?;

    check_secure(headers, &state.security)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !config.body_format.accepts(content_type) {
        return Err(HookError::UnsupportedContentType {
            expected: config.body_format.as_str(),
            actual: content_type.to_string(),
        });
    }

    let secret = state.secrets.get(receiver, id).await?;

    let signature = config
        .scheme
        .header_name()
        .and_then(|name| headers.get(name))
        .and_then(|v| v.to_str().ok());
    let code = params.get("code").map(String::as_str);

    if let Err(e) = config.verify(&secret, &body, signature, code) {
        tracing::warn!(
            target: "hook_receiver",
            receiver = %receiver,
            id = %id,
            error = %e,
            "Rejected inbound WebHook"
        );
        return Err(e);
    }

    tracing::debug!(
        target: "hook_receiver",
        receiver = %receiver,
        id = %id,
        body_len = body.len(),
        "Accepted inbound WebHook"
    );

    state.handler.on_event(receiver, id, body).await?;

    Ok(StatusCode::OK)
}

/// Enforce HTTPS for non-local requests.
///
/// TLS is assumed to terminate upstream; the effective scheme is read from
/// `X-Forwarded-Proto`. Requests whose `Host` is localhost are exempt.
fn check_secure(headers: &HeaderMap, security: &SecurityPolicy) -> Result<(), HookError> {
    if !security.require_https {
        return Ok(());
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if is_local_host(host) {
        return Ok(());
    }

    match headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
    {
        Some(proto) if proto.eq_ignore_ascii_case("https") => Ok(()),
        _ => Err(HookError::InsecureConnection),
    }
}

/// Whether a `Host` header value refers to the local machine.
fn is_local_host(host: &str) -> bool {
    let without_port = if let Some(bracket_end) = host.find(']') {
        // IPv6 literal like [::1]:8080
        &host[..=bracket_end]
    } else {
        host.split(':').next().unwrap_or("")
    };
    matches!(
        without_port.to_ascii_lowercase().as_str(),
        "localhost" | "127.0.0.1" | "[::1]"
    )
}
