//! End-to-end tests over a real TCP listener.
//!
//! Boots the server with the production provider client pointed at a mock
//! management API and an in-memory user store, then delivers signed webhooks
//! the way the identity provider would.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use serde_json::{json, Value};
use usersync_api::{AppState, ClerkClient, ClientConfig, WebhookVerifier, WEBHOOK_PATH};
use usersync_core::{Clock, ExternalId, SystemClock};
use usersync_testing::{
    RecordingUserStore, TestSigner, UserEventBuilder, TEST_API_KEY, TEST_WEBHOOK_SECRET,
};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

struct RunningServer {
    base_url: String,
    store: Arc<RecordingUserStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn start(provider_url: &str) -> Result<RunningServer> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(RecordingUserStore::new());
    let verifier =
        WebhookVerifier::new(TEST_WEBHOOK_SECRET, Duration::from_secs(300), clock.clone())?;
    let provider = ClerkClient::new(ClientConfig {
        base_url: format!("{provider_url}/v1"),
        api_key: TEST_API_KEY.to_string(),
        timeout: Some(Duration::from_secs(5)),
        user_agent: "usersync-e2e".to_string(),
    })?;

    let state = AppState::new(store.clone(), Arc::new(provider), verifier, clock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);

    let handle = tokio::spawn(async move {
        let _ = usersync_api::serve(listener, state).await;
    });

    Ok(RunningServer { base_url, store, handle })
}

async fn deliver(server: &RunningServer, msg_id: &str, body: Vec<u8>) -> Result<reqwest::Response> {
    let timestamp = SystemClock.unix_timestamp();
    let headers = TestSigner::for_tests().headers(msg_id, timestamp, &body);

    let mut request = reqwest::Client::new()
        .post(format!("{}{WEBHOOK_PATH}", server.base_url))
        .header("content-type", "application/json")
        .body(body);
    for (name, value) in headers.pairs() {
        request = request.header(name, value);
    }
    Ok(request.send().await?)
}

#[tokio::test]
async fn user_lifecycle_is_mirrored_and_written_back() -> Result<()> {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/users/user_e2e/metadata"))
        .and(header("authorization", format!("Bearer {TEST_API_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user_e2e" })))
        .expect(1)
        .mount(&provider)
        .await;

    let server = start(&provider.uri()).await?;
    let clerk_id = ExternalId::from("user_e2e");

    // Created
    let body = UserEventBuilder::created("user_e2e")
        .email("grace@example.com")
        .first_name("Grace")
        .last_name("Hopper")
        .to_body();
    let response = deliver(&server, "msg_1", body).await?;
    assert_eq!(response.status(), 200);
    let created: Value = response.json().await?;
    let user_id = created["user"]["id"].as_str().unwrap_or_default().to_string();
    assert!(!user_id.is_empty());

    let requests = provider.received_requests().await.unwrap_or_default();
    let sent: Value = serde_json::from_slice(&requests[0].body)?;
    assert_eq!(sent["publicMetadata"]["userId"], user_id.as_str());

    // Updated
    let body = UserEventBuilder::updated("user_e2e").username("amazing_grace").to_body();
    let response = deliver(&server, "msg_2", body).await?;
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await?;
    assert_eq!(updated["user"]["username"], "amazing_grace");
    assert_eq!(updated["user"]["firstName"], "Grace");

    // Deleted
    let body = UserEventBuilder::deleted("user_e2e").to_body();
    let response = deliver(&server, "msg_3", body).await?;
    assert_eq!(response.status(), 200);
    assert!(server.store.user(&clerk_id).await.is_none());

    Ok(())
}

#[tokio::test]
async fn provider_outage_fails_creation_with_500() -> Result<()> {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&provider)
        .await;

    let server = start(&provider.uri()).await?;
    let body = UserEventBuilder::created("user_down").email("down@example.com").to_body();

    let response = deliver(&server, "msg_1", body).await?;

    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await?, "Error occurred while creating user");
    Ok(())
}

#[tokio::test]
async fn unsigned_request_never_reaches_the_provider() -> Result<()> {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&provider)
        .await;

    let server = start(&provider.uri()).await?;
    let response = reqwest::Client::new()
        .post(format!("{}{WEBHOOK_PATH}", server.base_url))
        .body(UserEventBuilder::created("user_x").email("x@example.com").to_body())
        .send()
        .await?;

    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await?, "Error occurred -- no svix headers");
    assert!(server.store.calls().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn liveness_over_tcp() -> Result<()> {
    let provider = MockServer::start().await;
    let server = start(&provider.uri()).await?;

    let response = reqwest::get(format!("{}/live", server.base_url)).await?;

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}
