//! Shared harness for router-level tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use usersync_api::{create_router, AppState, WebhookVerifier, WEBHOOK_PATH};
use usersync_testing::{
    FixedClock, RecordingProvider, RecordingUserStore, SignatureHeaders, TestSigner,
    TEST_WEBHOOK_SECRET,
};

/// Unix time the harness clock is pinned to.
pub const NOW: i64 = 1_700_000_000;

/// Router wired to in-memory doubles.
pub struct TestApp {
    pub store: Arc<RecordingUserStore>,
    pub provider: Arc<RecordingProvider>,
    pub clock: FixedClock,
    pub signer: TestSigner,
    router: Router,
}

/// Status and raw body of one response.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: String,
    pub request_id: Option<String>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(RecordingUserStore::new());
        let provider = Arc::new(RecordingProvider::new());
        let clock = FixedClock::at(NOW);
        let verifier = WebhookVerifier::new(
            TEST_WEBHOOK_SECRET,
            Duration::from_secs(300),
            Arc::new(clock.clone()),
        )
        .unwrap();

        let state =
            AppState::new(store.clone(), provider.clone(), verifier, Arc::new(clock.clone()));
        let router = create_router(state);

        Self { store, provider, clock, signer: TestSigner::for_tests(), router }
    }

    /// Signature headers for `body` signed now.
    pub fn sign(&self, msg_id: &str, body: &[u8]) -> SignatureHeaders {
        self.signer.headers(msg_id, NOW, body)
    }

    /// Posts a correctly signed webhook.
    pub async fn deliver(&self, body: Vec<u8>) -> TestResponse {
        let headers = self.sign("msg_test", &body);
        self.post_webhook(body, headers.pairs().as_slice()).await
    }

    /// Posts to the webhook route with exactly the given headers.
    pub async fn post_webhook(&self, body: Vec<u8>, headers: &[(&str, &str)]) -> TestResponse {
        let mut request = Request::builder()
            .method("POST")
            .uri(WEBHOOK_PATH)
            .header("content-type", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.send(request.body(Body::from(body)).unwrap()).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse { status, body: String::from_utf8(bytes.to_vec()).unwrap(), request_id }
    }
}
