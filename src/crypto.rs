//! HMAC signature primitives for WebHook payloads.
//!
//! Outbound deliveries are signed with HMAC-SHA256 over the exact body
//! bytes. Inbound verification supports the provider-specific algorithm
//! (SHA-1 or SHA-256) and encoding (hex or Base64), always comparing
//! digests in constant time.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::HookError;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// HMAC digest algorithm used by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacAlgorithm {
    Sha1,
    Sha256,
}

/// Wire encoding of a provided signature value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureEncoding {
    Hex,
    Base64,
}

/// Compute an HMAC digest over `body` with the given secret.
#[must_use]
pub fn compute_signature(algorithm: HmacAlgorithm, secret: &[u8], body: &[u8]) -> Vec<u8> {
    match algorithm {
        HmacAlgorithm::Sha1 => {
            let mut mac =
                <HmacSha1 as Mac>::new_from_slice(secret).expect("HMAC can take key of any size");
            mac.update(body);
            mac.finalize().into_bytes().to_vec()
        }
        HmacAlgorithm::Sha256 => {
            let mut mac =
                <HmacSha256 as Mac>::new_from_slice(secret).expect("HMAC can take key of any size");
            mac.update(body);
            mac.finalize().into_bytes().to_vec()
        }
    }
}

/// Compute the hex HMAC-SHA256 signature attached to outbound deliveries.
#[must_use]
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    hex::encode(compute_signature(HmacAlgorithm::Sha256, secret.as_bytes(), body))
}

/// Decode a provided signature value into raw digest bytes.
///
/// Strips the provider prefix (e.g. `sha1=`) when one is expected. Malformed
/// input is a classified [`HookError::InvalidSignature`], never a panic.
pub fn decode_signature(
    value: &str,
    encoding: SignatureEncoding,
    prefix: Option<&str>,
) -> Result<Vec<u8>, HookError> {
    let digest = match prefix {
        Some(p) => value.strip_prefix(p).ok_or_else(|| {
            HookError::InvalidSignature(format!("signature value must start with '{p}'"))
        })?,
        None => value,
    };

    match encoding {
        SignatureEncoding::Hex => hex::decode(digest)
            .map_err(|e| HookError::InvalidSignature(format!("invalid hex digest: {e}"))),
        SignatureEncoding::Base64 => BASE64
            .decode(digest)
            .map_err(|e| HookError::InvalidSignature(format!("invalid base64 digest: {e}"))),
    }
}

/// Verify a provided signature against the raw request body.
///
/// Computes the HMAC over the exact `body` bytes and compares it to the
/// decoded provided digest with a constant-time comparison.
pub fn verify(
    body: &[u8],
    provided: &str,
    secret: &str,
    algorithm: HmacAlgorithm,
    encoding: SignatureEncoding,
    prefix: Option<&str>,
) -> Result<(), HookError> {
    let provided_digest = decode_signature(provided, encoding, prefix)?;
    let computed = compute_signature(algorithm, secret.as_bytes(), body);

    if constant_time_eq(&computed, &provided_digest) {
        Ok(())
    } else {
        Err(HookError::InvalidSignature(
            "signature digest mismatch".to_string(),
        ))
    }
}

/// Constant-time byte comparison to prevent timing attacks on secrets.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
