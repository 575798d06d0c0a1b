//! HTTP client for the identity provider's management API.
//!
//! Used once per newly created user to stamp the internal user ID onto the
//! provider's public metadata.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::Url;
use serde_json::json;
use tracing::{info_span, Instrument};
use usersync_core::{ExternalId, IdentityProvider, ProviderError, UserId};

const MAX_ERROR_BODY: usize = 1024;

/// Configuration for the provider client.
#[derive(Clone)]
pub struct ClientConfig {
    /// API base URL without trailing slash, e.g. `https://api.clerk.dev/v1`.
    pub base_url: String,
    /// Secret key sent as a bearer token.
    pub api_key: String,
    /// Timeout for a whole request; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// User agent string for requests.
    pub user_agent: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Management API client backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ClerkClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ClerkClient {
    /// Creates a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Request` if the base URL is unusable or the
    /// HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ProviderError> {
        Url::parse(&config.base_url)
            .map_err(|e| ProviderError::Request(format!("invalid base URL: {e}")))?;

        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn metadata_url(&self, clerk_id: &ExternalId) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| ProviderError::Request(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ProviderError::Request("base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(["users", clerk_id.as_str(), "metadata"]);
        Ok(url)
    }
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn set_user_metadata(
        &self,
        clerk_id: &ExternalId,
        user_id: UserId,
    ) -> Result<(), ProviderError> {
        let span = info_span!("set_user_metadata", clerk_id = %clerk_id, user_id = %user_id);

        async move {
            let url = self.metadata_url(clerk_id)?;
            let body = json!({ "publicMetadata": { "userId": user_id } });
            let start_time = std::time::Instant::now();

            let response = self
                .client
                .post(url)
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| {
                    tracing::warn!(
                        duration_ms = start_time.elapsed().as_millis(),
                        "Request failed: {}",
                        e
                    );
                    if e.is_timeout() {
                        ProviderError::Request(format!("request timed out: {e}"))
                    } else {
                        ProviderError::Request(e.to_string())
                    }
                })?;

            let status = response.status();
            tracing::debug!(
                status = status.as_u16(),
                duration_ms = start_time.elapsed().as_millis(),
                "Received response"
            );

            if status.is_success() {
                return Ok(());
            }

            let body = match response.text().await {
                Ok(text) => truncate(text),
                Err(e) => format!("[Failed to read response body: {e}]"),
            };
            tracing::warn!(status = status.as_u16(), "Provider rejected metadata update");
            Err(ProviderError::Status { status: status.as_u16(), body })
        }
        .instrument(span)
        .await
    }
}

fn truncate(mut text: String) -> String {
    if text.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push_str("... (truncated)");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ClientConfig {
        ClientConfig {
            base_url: base_url.to_string(),
            api_key: "sk_test".to_string(),
            timeout: Some(Duration::from_secs(5)),
            user_agent: "usersync-test".to_string(),
        }
    }

    #[test]
    fn metadata_url_appends_segments() {
        let client = ClerkClient::new(config("https://api.clerk.dev/v1")).unwrap();
        let url = client.metadata_url(&ExternalId::from("user_2abc")).unwrap();
        assert_eq!(url.as_str(), "https://api.clerk.dev/v1/users/user_2abc/metadata");
    }

    #[test]
    fn metadata_url_escapes_ids() {
        let client = ClerkClient::new(config("https://api.clerk.dev/v1")).unwrap();
        let url = client.metadata_url(&ExternalId::from("a/b")).unwrap();
        assert_eq!(url.as_str(), "https://api.clerk.dev/v1/users/a%2Fb/metadata");
    }

    #[test]
    fn invalid_base_url_rejected() {
        assert!(matches!(
            ClerkClient::new(config("not a url")),
            Err(ProviderError::Request(_))
        ));
    }

    #[test]
    fn debug_output_hides_api_key() {
        assert!(!format!("{:?}", config("https://x")).contains("sk_test"));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let text = truncate("x".repeat(4096));
        assert!(text.ends_with("... (truncated)"));
        assert!(text.len() < 1100);
    }
}
