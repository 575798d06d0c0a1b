//! Webhook signature verification.
//!
//! Deliveries are signed with HMAC-SHA256 over `{id}.{timestamp}.{body}`
//! using the base64 key carried in a `whsec_`-prefixed secret. The signature
//! header holds one or more space-separated `v1,<base64>` entries so the
//! sender can rotate keys; any single match authenticates the request.

use std::{fmt, sync::Arc, time::Duration};

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use usersync_core::Clock;

type HmacSha256 = Hmac<Sha256>;

/// Accepted distance between the signed timestamp and now.
pub const DEFAULT_TOLERANCE_SECONDS: u64 = 300;

/// Header carrying the unique message ID.
pub const ID_HEADER: &str = "svix-id";
/// Header carrying the send time in Unix seconds.
pub const TIMESTAMP_HEADER: &str = "svix-timestamp";
/// Header carrying the signature list.
pub const SIGNATURE_HEADER: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// Reasons a delivery fails authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The signing secret is not valid base64.
    #[error("invalid webhook secret")]
    InvalidSecret,

    /// The timestamp header is not an integer.
    #[error("invalid timestamp header: {0}")]
    InvalidTimestamp(String),

    /// The timestamp is older than the tolerance window.
    #[error("message timestamp too old")]
    TimestampTooOld,

    /// The timestamp is further in the future than the tolerance window.
    #[error("message timestamp too new")]
    TimestampTooNew,

    /// No entry in the signature header could be decoded.
    #[error("no supported signature in header")]
    InvalidSignatureFormat,

    /// Entries were well formed but none matched.
    #[error("no matching signature found")]
    NoMatchingSignature,
}

/// The three headers a signed delivery must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookHeaders {
    /// Unique message ID, stable across redeliveries.
    pub id: String,
    /// Send time in Unix seconds, as received.
    pub timestamp: String,
    /// Space-separated `version,signature` entries.
    pub signature: String,
}

impl WebhookHeaders {
    /// Reads the signature headers, returning `None` if any is missing, empty,
    /// or not valid UTF-8.
    pub fn from_header_map(headers: &HeaderMap) -> Option<Self> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            id: get(ID_HEADER)?,
            timestamp: get(TIMESTAMP_HEADER)?,
            signature: get(SIGNATURE_HEADER)?,
        })
    }
}

/// Verifies signed webhook deliveries against one secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
    tolerance: i64,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("key", &"***")
            .field("tolerance", &self.tolerance)
            .field("clock", &self.clock)
            .finish()
    }
}

impl WebhookVerifier {
    /// Creates a verifier for a `whsec_`-prefixed or bare base64 secret.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::InvalidSecret` if the secret does not
    /// decode to a non-empty key.
    pub fn new(
        secret: &str,
        tolerance: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, VerificationError> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);
        let key = STANDARD.decode(encoded).map_err(|_| VerificationError::InvalidSecret)?;
        if key.is_empty() {
            return Err(VerificationError::InvalidSecret);
        }

        let tolerance = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);
        Ok(Self { key, tolerance, clock })
    }

    /// Checks that `body` was signed with this secret and sent recently.
    ///
    /// `body` must be the exact bytes received; re-serialized JSON will not
    /// verify.
    pub fn verify(&self, headers: &WebhookHeaders, body: &[u8]) -> Result<(), VerificationError> {
        let timestamp = headers
            .timestamp
            .parse::<i64>()
            .map_err(|_| VerificationError::InvalidTimestamp(headers.timestamp.clone()))?;
        self.check_timestamp(timestamp)?;

        let expected = self.sign_bytes(&headers.id, timestamp, body)?;

        let mut saw_candidate = false;
        for entry in headers.signature.split_whitespace() {
            let Some((version, encoded)) = entry.split_once(',') else { continue };
            if version != SIGNATURE_VERSION {
                continue;
            }
            let Ok(candidate) = STANDARD.decode(encoded) else { continue };
            saw_candidate = true;

            if timing_safe_eq(&candidate, &expected) {
                return Ok(());
            }
        }

        if saw_candidate {
            Err(VerificationError::NoMatchingSignature)
        } else {
            Err(VerificationError::InvalidSignatureFormat)
        }
    }

    /// Produces the `v1,<base64>` signature for a message.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::InvalidSecret` if the key is rejected by
    /// the MAC.
    pub fn sign(
        &self,
        msg_id: &str,
        timestamp: i64,
        body: &[u8],
    ) -> Result<String, VerificationError> {
        let signature = self.sign_bytes(msg_id, timestamp, body)?;
        Ok(format!("{SIGNATURE_VERSION},{}", STANDARD.encode(signature)))
    }

    fn check_timestamp(&self, timestamp: i64) -> Result<(), VerificationError> {
        let now = self.clock.unix_timestamp();

        if now.saturating_sub(timestamp) > self.tolerance {
            return Err(VerificationError::TimestampTooOld);
        }
        if timestamp.saturating_sub(now) > self.tolerance {
            return Err(VerificationError::TimestampTooNew);
        }
        Ok(())
    }

    fn sign_bytes(
        &self,
        msg_id: &str,
        timestamp: i64,
        body: &[u8],
    ) -> Result<Vec<u8>, VerificationError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| VerificationError::InvalidSecret)?;
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Constant-time comparison so mismatches do not leak how many leading bytes
/// were correct.
fn timing_safe_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (a_byte, b_byte) in a.iter().zip(b.iter()) {
        result |= a_byte ^ b_byte;
    }

    result == 0
}
