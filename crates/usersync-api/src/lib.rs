//! HTTP surface of the user sync service.
//!
//! Receives signed identity provider webhooks, verifies them, and keeps the
//! application's user table in step. Also hosts configuration loading and the
//! provider's management API client.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod provider;
pub mod server;

pub use config::Config;
pub use crypto::{VerificationError, WebhookHeaders, WebhookVerifier};
pub use error::WebhookError;
pub use provider::{ClerkClient, ClientConfig};
pub use server::{create_router, serve, start_server, AppState, WEBHOOK_PATH};
