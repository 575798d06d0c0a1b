//! Signs webhook bodies the way the delivery service does.
//!
//! Kept independent of the verifier under test: it derives the key and
//! builds the signed content itself, so a bug in one side shows up as a
//! verification failure instead of cancelling out.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signing secret used across API tests.
pub const TEST_WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

/// Provider API key used across API tests.
pub const TEST_API_KEY: &str = "sk_test_usersync";

/// The three signature headers for one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeaders {
    /// `svix-id`
    pub id: String,
    /// `svix-timestamp`
    pub timestamp: String,
    /// `svix-signature`
    pub signature: String,
}

impl SignatureHeaders {
    /// Header name/value pairs ready to attach to a request.
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("svix-id", self.id.as_str()),
            ("svix-timestamp", self.timestamp.as_str()),
            ("svix-signature", self.signature.as_str()),
        ]
    }
}

/// Produces valid signature headers for a secret.
#[derive(Clone)]
pub struct TestSigner {
    key: Vec<u8>,
}

impl TestSigner {
    /// Creates a signer for a `whsec_`-prefixed (or bare) base64 secret.
    ///
    /// # Panics
    ///
    /// Panics if the secret is not valid base64; test secrets are constants.
    #[allow(clippy::expect_used)]
    pub fn new(secret: &str) -> Self {
        let encoded = secret.strip_prefix("whsec_").unwrap_or(secret);
        let key = STANDARD.decode(encoded).expect("test secret must be base64");
        Self { key }
    }

    /// Signer for [`TEST_WEBHOOK_SECRET`].
    pub fn for_tests() -> Self {
        Self::new(TEST_WEBHOOK_SECRET)
    }

    /// Returns the `v1,<base64>` signature for one message.
    #[allow(clippy::expect_used)]
    pub fn signature(&self, msg_id: &str, timestamp: i64, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Returns the full header set for one message.
    pub fn headers(&self, msg_id: &str, timestamp: i64, body: &[u8]) -> SignatureHeaders {
        SignatureHeaders {
            id: msg_id.to_string(),
            timestamp: timestamp.to_string(),
            signature: self.signature(msg_id, timestamp, body),
        }
    }
}
