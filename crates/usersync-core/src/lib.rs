//! Core domain models, identity events, and storage for user synchronization.
//!
//! Provides the strongly-typed user model, the parser that turns verified
//! webhook bodies into [`IdentityEvent`]s, the lazily-initialized
//! [`ConnectionCache`], and the [`UserStore`] abstraction with its PostgreSQL
//! implementation. The HTTP crate depends on these types only.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod connection;
pub mod error;
pub mod events;
pub mod models;
pub mod provider;
pub mod storage;
pub mod time;

pub use connection::{ConnectionCache, Connector, PgConnector};
pub use error::{CoreError, ParseError, Result};
pub use events::{IdentityEvent, UserCreated, UserDeleted, UserUpdated};
pub use models::{ExternalId, NewUser, UserId, UserRecord, UserUpdate};
pub use provider::{IdentityProvider, ProviderError};
pub use storage::UserStore;
pub use time::{Clock, FixedClock, SystemClock};
