//! Per-provider receiver capabilities.
//!
//! Each provider differs in body format, signature algorithm, header name,
//! and digest encoding. Rather than a type per provider, a receiver is a
//! small capability record resolved once per request from a registry keyed
//! by receiver name.

use std::collections::HashMap;

use crate::crypto::{self, HmacAlgorithm, SignatureEncoding};
use crate::error::HookError;
use crate::validation;

/// Body format a receiver requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Xml,
    Form,
}

impl BodyFormat {
    /// Human-readable name used in error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Xml => "XML",
            Self::Form => "form data",
        }
    }

    /// Whether a request `Content-Type` value satisfies this format.
    ///
    /// Media-type parameters (e.g. `; charset=utf-8`) are ignored.
    #[must_use]
    pub fn accepts(&self, content_type: &str) -> bool {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match self {
            Self::Json => media_type == "application/json" || media_type.ends_with("+json"),
            Self::Xml => {
                media_type == "application/xml"
                    || media_type == "text/xml"
                    || media_type.ends_with("+xml")
            }
            Self::Form => media_type == "application/x-www-form-urlencoded",
        }
    }
}

/// How a receiver authenticates requests.
#[derive(Debug, Clone)]
pub enum SignatureScheme {
    /// HMAC-SHA1 over the raw body, carried in a header.
    HmacSha1 {
        header: String,
        encoding: SignatureEncoding,
        prefix: Option<String>,
    },
    /// HMAC-SHA256 over the raw body, carried in a header.
    HmacSha256 {
        header: String,
        encoding: SignatureEncoding,
        prefix: Option<String>,
    },
    /// Lightweight auth via a 32-128 character `code` query parameter, for
    /// providers without a signature scheme.
    CodeQuery,
}

impl SignatureScheme {
    /// The header carrying the signature, if this scheme uses one.
    #[must_use]
    pub fn header_name(&self) -> Option<&str> {
        match self {
            Self::HmacSha1 { header, .. } | Self::HmacSha256 { header, .. } => Some(header),
            Self::CodeQuery => None,
        }
    }
}

/// Capability record for one receiver.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Receiver name, matched case-insensitively in the request path.
    pub name: String,
    /// Required request body format.
    pub body_format: BodyFormat,
    /// Authentication scheme.
    pub scheme: SignatureScheme,
}

impl ReceiverConfig {
    /// Verify an inbound request against this receiver's scheme.
    ///
    /// `signature` is the raw value of the scheme's signature header (if
    /// any); `code` is the `code` query parameter. The body is the verbatim
    /// request bytes, untouched by any decoding.
    pub fn verify(
        &self,
        secret: &str,
        body: &[u8],
        signature: Option<&str>,
        code: Option<&str>,
    ) -> Result<(), HookError> {
        match &self.scheme {
            SignatureScheme::HmacSha1 {
                header,
                encoding,
                prefix,
            } => {
                let provided = signature.ok_or_else(|| {
                    HookError::InvalidSignature(format!("missing '{header}' header"))
                })?;
                crypto::verify(
                    body,
                    provided,
                    secret,
                    HmacAlgorithm::Sha1,
                    *encoding,
                    prefix.as_deref(),
                )
            }
            SignatureScheme::HmacSha256 {
                header,
                encoding,
                prefix,
            } => {
                let provided = signature.ok_or_else(|| {
                    HookError::InvalidSignature(format!("missing '{header}' header"))
                })?;
                crypto::verify(
                    body,
                    provided,
                    secret,
                    HmacAlgorithm::Sha256,
                    *encoding,
                    prefix.as_deref(),
                )
            }
            SignatureScheme::CodeQuery => {
                let code = code.ok_or_else(|| {
                    HookError::Validation("missing 'code' query parameter".to_string())
                })?;
                validation::validate_code(code)?;
                if crypto::constant_time_eq(code.as_bytes(), secret.as_bytes()) {
                    Ok(())
                } else {
                    Err(HookError::InvalidSignature(
                        "'code' query parameter mismatch".to_string(),
                    ))
                }
            }
        }
    }
}

/// Registry of receiver capability records, keyed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct ReceiverRegistry {
    receivers: HashMap<String, ReceiverConfig>,
}

impl ReceiverRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in receivers:
    /// - `github`: HMAC-SHA1 hex in `X-Hub-Signature` with `sha1=` prefix
    /// - `generic`: HMAC-SHA256 hex in `X-Hook-Signature` with `sha256=` prefix
    /// - `custom`: `code` query parameter
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ReceiverConfig {
            name: "github".to_string(),
            body_format: BodyFormat::Json,
            scheme: SignatureScheme::HmacSha1 {
                header: "X-Hub-Signature".to_string(),
                encoding: SignatureEncoding::Hex,
                prefix: Some("sha1=".to_string()),
            },
        });
        registry.register(ReceiverConfig {
            name: "generic".to_string(),
            body_format: BodyFormat::Json,
            scheme: SignatureScheme::HmacSha256 {
                header: "X-Hook-Signature".to_string(),
                encoding: SignatureEncoding::Hex,
                prefix: Some("sha256=".to_string()),
            },
        });
        registry.register(ReceiverConfig {
            name: "custom".to_string(),
            body_format: BodyFormat::Json,
            scheme: SignatureScheme::CodeQuery,
        });
        registry
    }

    /// Register or replace a receiver.
    pub fn register(&mut self, config: ReceiverConfig) {
        self.receivers
            .insert(config.name.to_ascii_lowercase(), config);
    }

    /// Resolve a receiver by name, case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ReceiverConfig> {
        self.receivers.get(&name.to_ascii_lowercase())
    }
}
