//! Push webhook signature verification using HMAC-SHA256.
//!
//! The provider signs webhook payloads using HMAC-SHA256 keyed with the
//! project's shared secret. The signature is provided in the
//! `X-Hub-Signature-256` header as `sha256=<hex>`.
//!
//! Verification runs over the exact raw body bytes, before any parsing.
//!
//! # Unsigned deliveries
//!
//! [`check_signature`] skips verification when the project has no secret or
//! the request carries no signature header. Anyone who knows the project id
//! can therefore push commits into a secret-less project. Projects created
//! through the API always receive a secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Result of checking a delivery against its project's secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// The signature matched the body.
    Verified,
    /// No secret configured or no signature supplied; nothing was checked.
    Skipped,
    /// A signature was supplied and did not match.
    Rejected,
}

impl SignatureCheck {
    /// Returns true unless the signature was rejected.
    pub fn is_accepted(self) -> bool {
        !matches!(self, SignatureCheck::Rejected)
    }
}

/// Checks an optional signature header against an optional project secret.
///
/// See the module docs for when verification is skipped.
pub fn check_signature(
    payload: &[u8],
    signature_header: Option<&str>,
    secret: Option<&str>,
) -> SignatureCheck {
    match (signature_header, secret) {
        (Some(header), Some(secret)) => {
            if verify_signature(payload, header, secret.as_bytes()) {
                SignatureCheck::Verified
            } else {
                SignatureCheck::Rejected
            }
        }
        _ => SignatureCheck::Skipped,
    }
}

/// Parses a signature header (e.g., "sha256=abc123...") into raw bytes.
///
/// Returns `None` for a missing prefix, another algorithm, or invalid hex.
///
/// ```
/// use commit_feed::webhooks::parse_signature_header;
///
/// assert!(parse_signature_header("sha256=abcd1234").is_some());
/// assert!(parse_signature_header("sha1=abcd1234").is_none());
/// assert!(parse_signature_header("sha256=xyz").is_none());
/// ```
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    hex::decode(header.strip_prefix("sha256=")?).ok()
}

/// Computes the HMAC-SHA256 signature of a payload using the given secret.
///
/// Used by tests and tooling to sign payloads the way the provider does.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as an `X-Hub-Signature-256` header value (`sha256=<hex>`).
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha256={}", hex::encode(signature))
}

/// Verifies a webhook signature against the payload and secret.
///
/// `signature_header` is the raw `X-Hub-Signature-256` value. The MAC
/// comparison is constant-time.
///
/// ```
/// use commit_feed::webhooks::{compute_signature, format_signature_header, verify_signature};
///
/// let header = format_signature_header(&compute_signature(b"body", b"key"));
/// assert!(verify_signature(b"body", &header, b"key"));
/// assert!(!verify_signature(b"body", &header, b"other-key"));
/// ```
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(claimed) = parse_signature_header(signature_header) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&claimed).is_ok()
}
