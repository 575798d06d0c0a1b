#![no_main]

//! Fuzz target for webhook signature verification.
//!
//! Splits the input into headers and body. Verification must never panic on
//! malformed headers, and an unsigned input must never authenticate.

use std::{sync::Arc, time::Duration};

use libfuzzer_sys::fuzz_target;
use usersync_api::{WebhookHeaders, WebhookVerifier};
use usersync_core::FixedClock;

const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
const NOW: i64 = 1_700_000_000;

fuzz_target!(|data: &[u8]| {
    let Ok(verifier) =
        WebhookVerifier::new(SECRET, Duration::from_secs(300), Arc::new(FixedClock::at(NOW)))
    else {
        return;
    };

    // Layout: id \n timestamp \n signature \n body
    let mut parts = data.splitn(4, |b| *b == b'\n');
    let id = String::from_utf8_lossy(parts.next().unwrap_or_default()).into_owned();
    let timestamp = String::from_utf8_lossy(parts.next().unwrap_or_default()).into_owned();
    let signature = String::from_utf8_lossy(parts.next().unwrap_or_default()).into_owned();
    let body = parts.next().unwrap_or_default();

    let headers = WebhookHeaders { id: id.clone(), timestamp, signature };
    assert!(verifier.verify(&headers, body).is_err());

    // A signature made by the verifier itself must round-trip for any body.
    if let Ok(signature) = verifier.sign(&id, NOW, body) {
        let headers = WebhookHeaders { id, timestamp: NOW.to_string(), signature };
        assert!(verifier.verify(&headers, body).is_ok());
    }
});
