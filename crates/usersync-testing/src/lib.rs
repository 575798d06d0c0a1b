//! Test infrastructure for usersync.
//!
//! Provides recording doubles for the user store and identity provider,
//! payload builders, a signer for webhook headers, and PostgreSQL helpers
//! for the (ignored by default) repository tests.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod database;
pub mod fakes;
pub mod fixtures;
pub mod signing;

pub use database::{unique_clerk_id, TestDatabase};
pub use fakes::{RecordingProvider, RecordingUserStore, StoreCall};
pub use fixtures::UserEventBuilder;
pub use signing::{SignatureHeaders, TestSigner, TEST_API_KEY, TEST_WEBHOOK_SECRET};
pub use usersync_core::{Clock, FixedClock};
