//! Secret lookup for inbound receiver verification.
//!
//! A missing secret is a configuration error: it indicates a deployment
//! defect, not a bad request, and is surfaced loudly.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::HookError;

/// Resolves the verification secret for a receiver, optionally scoped to a
/// per-hook id.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Look up the secret for `(receiver, id)`. `id` is empty for the
    /// receiver-wide secret.
    async fn get(&self, receiver: &str, id: &str) -> Result<String, HookError>;
}

/// In-memory secret store keyed by `(receiver, id)`.
///
/// A lookup with a non-empty id falls back to the receiver-wide entry
/// (empty id) when no id-scoped secret exists.
#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: RwLock<HashMap<(String, String), String>>,
}

impl InMemorySecretStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a secret for `(receiver, id)`. Use an empty `id` for the
    /// receiver-wide secret.
    pub async fn insert(&self, receiver: &str, id: &str, secret: &str) {
        let mut secrets = self.secrets.write().await;
        secrets.insert(
            (receiver.to_ascii_lowercase(), id.to_string()),
            secret.to_string(),
        );
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, receiver: &str, id: &str) -> Result<String, HookError> {
        let receiver_key = receiver.to_ascii_lowercase();
        let secrets = self.secrets.read().await;

        if let Some(secret) = secrets.get(&(receiver_key.clone(), id.to_string())) {
            return Ok(secret.clone());
        }
        if !id.is_empty() {
            if let Some(secret) = secrets.get(&(receiver_key, String::new())) {
                return Ok(secret.clone());
            }
        }

        Err(HookError::MissingSecret {
            receiver: receiver.to_string(),
            id: id.to_string(),
        })
    }
}
