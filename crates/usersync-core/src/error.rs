//! Error types and result handling for user synchronization.
//!
//! Separates infrastructure failures (configuration, connection, database)
//! from payload failures (parsing) so the HTTP layer can map each to the
//! right status without inspecting messages.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for storage and connection operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Required configuration is missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Establishing the database connection failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Entity not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Constraint violation.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl CoreError {
    /// Short machine-readable kind, used as a structured log field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Connection(_) => "connection",
            Self::Database(_) => "database",
            Self::NotFound(_) => "not_found",
            Self::ConstraintViolation(_) => "constraint_violation",
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("requested entity not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::ConstraintViolation(format!("unique constraint violation: {db_err}"))
            },
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                Self::ConstraintViolation(format!("check constraint violation: {db_err}"))
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

/// Failure to turn a verified webhook body into an [`IdentityEvent`].
///
/// [`IdentityEvent`]: crate::events::IdentityEvent
#[derive(Debug, Error)]
pub enum ParseError {
    /// Body is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Body is JSON but not an event object.
    #[error("payload is not an event object")]
    NotAnObject,

    /// The event `type` field is absent or not a string.
    #[error("event type missing")]
    MissingType,

    /// A field the event kind requires is absent.
    #[error("event {event_type} missing required field `{field}`")]
    MissingField {
        /// Event type being parsed
        event_type: String,
        /// Dotted path of the missing field
        field: &'static str,
    },

    /// The `data` object does not match the shape of its event kind.
    #[error("event {event_type} has malformed data: {source}")]
    MalformedData {
        /// Event type being parsed
        event_type: String,
        /// Underlying deserialization failure
        source: serde_json::Error,
    },
}
