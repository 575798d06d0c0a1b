//! Outbound calls to the identity provider.
//!
//! After a user row is created, its internal ID is written back onto the
//! provider's user record as public metadata so client sessions can carry
//! it. The HTTP implementation lives in the API crate.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ExternalId, UserId};

/// Errors from the identity provider's management API.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Request could not be sent or the response could not be read.
    #[error("provider request failed: {0}")]
    Request(String),

    /// Provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },
}

/// Management operations on the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Stamps the application's user ID onto the provider user's public
    /// metadata.
    async fn set_user_metadata(
        &self,
        clerk_id: &ExternalId,
        user_id: UserId,
    ) -> Result<(), ProviderError>;
}
