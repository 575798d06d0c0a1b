//! Webhook failures and their HTTP responses.
//!
//! Response bodies are fixed plain-text strings so the sender's delivery log
//! shows a stable reason without leaking internals.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use usersync_core::{CoreError, ParseError, ProviderError};

use crate::crypto::VerificationError;

/// Everything that can end a webhook request early.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// One or more `svix-*` headers were absent.
    #[error("missing signature headers")]
    MissingHeaders,

    /// The signature did not authenticate the body.
    #[error("verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// The body verified but is not a usable event.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] ParseError),

    /// A `user.created` event carried no email address.
    #[error("user.created event has no email addresses")]
    NoEmailAddresses,

    /// Inserting the user failed.
    #[error("failed to create user: {0}")]
    CreateUser(#[source] CoreError),

    /// Writing the internal ID back to the provider failed.
    #[error("failed to write back user metadata: {0}")]
    WriteBack(#[from] ProviderError),

    /// An update or delete failed in the store.
    #[error(transparent)]
    Store(#[from] CoreError),
}

impl WebhookError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingHeaders
            | Self::Verification(_)
            | Self::InvalidPayload(_)
            | Self::NoEmailAddresses => StatusCode::BAD_REQUEST,
            Self::CreateUser(_) | Self::WriteBack(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Plain-text body sent to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingHeaders => "Error occurred -- no svix headers",
            Self::Verification(_) => "Error occurred",
            Self::InvalidPayload(_) => "Error occurred -- invalid payload",
            Self::NoEmailAddresses => "Error occurred -- no email addresses",
            Self::CreateUser(_) | Self::WriteBack(_) => "Error occurred while creating user",
            Self::Store(_) => "Internal Server Error",
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::Store(e) = &self {
            error!(error = %e, kind = e.kind(), "Unhandled store error");
        }
        (status, self.message()).into_response()
    }
}
