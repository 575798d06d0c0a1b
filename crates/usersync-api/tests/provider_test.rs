//! Identity provider client tests against a mock HTTP server.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use serde_json::json;
use usersync_api::{ClerkClient, ClientConfig};
use usersync_core::{ExternalId, IdentityProvider, ProviderError, UserId};
use usersync_testing::TEST_API_KEY;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn client_for(server: &MockServer, timeout: Option<Duration>) -> ClerkClient {
    ClerkClient::new(ClientConfig {
        base_url: format!("{}/v1", server.uri()),
        api_key: TEST_API_KEY.to_string(),
        timeout,
        user_agent: "usersync-test".to_string(),
    })
    .unwrap()
}

#[tokio::test]
async fn writes_user_id_into_public_metadata() {
    let server = MockServer::start().await;
    let user_id = UserId::new();

    Mock::given(method("POST"))
        .and(path("/v1/users/user_2abc/metadata"))
        .and(header("authorization", format!("Bearer {TEST_API_KEY}").as_str()))
        .and(header("user-agent", "usersync-test"))
        .and(body_json(json!({ "publicMetadata": { "userId": user_id.to_string() } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user_2abc" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    client.set_user_metadata(&ExternalId::from("user_2abc"), user_id).await.unwrap();
}

#[tokio::test]
async fn non_success_status_is_reported_with_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_string(r#"{"errors":[{"code":"form_param_unknown"}]}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let err =
        client.set_user_metadata(&ExternalId::from("user_1"), UserId::new()).await.unwrap_err();

    match err {
        ProviderError::Status { status, body } => {
            assert_eq!(status, 422);
            assert!(body.contains("form_param_unknown"));
        },
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_provider_times_out_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client = client_for(&server, Some(Duration::from_millis(100)));
    let err =
        client.set_user_metadata(&ExternalId::from("user_1"), UserId::new()).await.unwrap_err();

    assert!(matches!(err, ProviderError::Request(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_provider_is_a_request_error() {
    let server = MockServer::start().await;
    let client = client_for(&server, Some(Duration::from_secs(1)));
    drop(server);

    let err =
        client.set_user_metadata(&ExternalId::from("user_1"), UserId::new()).await.unwrap_err();

    assert!(matches!(err, ProviderError::Request(_)), "got {err:?}");
}
