//! HTTP request handlers.
//!
//! - `webhook` - identity provider webhook receiver
//! - `health` - health, readiness, and liveness probes
//!
//! Webhook failures are returned as [`WebhookError`](crate::error::WebhookError),
//! which renders the status and fixed plain-text body for each case.

pub mod health;
pub mod webhook;

pub use health::{health_check, liveness_check, readiness_check};
pub use webhook::clerk_webhook;
