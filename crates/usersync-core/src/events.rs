//! Identity lifecycle events delivered by the authentication provider.
//!
//! A verified webhook body is parsed exactly once into an [`IdentityEvent`].
//! The three user lifecycle kinds carry strongly-typed payloads; anything
//! else is kept as [`IdentityEvent::Other`] so it can be acknowledged and
//! logged without being treated as an error.
//!
//! ```text
//! {"type": "user.created", "object": "event", "data": {"id": "user_..", ...}}
//!            │
//!            ▼
//!   IdentityEvent::Created(UserCreated { id, email_addresses, .. })
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    error::ParseError,
    models::{ExternalId, NewUser, UserUpdate},
};

/// Event type for a newly registered user.
pub const USER_CREATED: &str = "user.created";
/// Event type for a profile change.
pub const USER_UPDATED: &str = "user.updated";
/// Event type for a removed user.
pub const USER_DELETED: &str = "user.deleted";

/// Parsed identity event, consumed once by the webhook dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    /// `user.created`
    Created(UserCreated),
    /// `user.updated`
    Updated(UserUpdated),
    /// `user.deleted`
    Deleted(UserDeleted),
    /// Any event type this service does not act on.
    Other {
        /// Raw event type string
        event_type: String,
        /// `data.id` when present
        id: Option<ExternalId>,
    },
}

/// Email entry on a provider user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailAddress {
    /// The address itself
    #[serde(default)]
    pub email_address: Option<String>,
}

/// Payload of a `user.created` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCreated {
    /// Provider user ID
    pub id: ExternalId,
    /// All email addresses, primary first as delivered
    pub email_addresses: Vec<EmailAddress>,
    /// Username
    pub username: Option<String>,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Profile image URL
    pub image_url: Option<String>,
}

/// Payload of a `user.updated` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdated {
    /// Provider user ID
    pub id: ExternalId,
    /// Username
    pub username: Option<String>,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Profile image URL
    pub image_url: Option<String>,
}

/// Payload of a `user.deleted` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDeleted {
    /// Provider user ID
    pub id: ExternalId,
}

/// Profile fields shared by created and updated payloads.
#[derive(Debug, Default, Deserialize)]
struct ProfileFields {
    #[serde(default)]
    email_addresses: Option<Vec<EmailAddress>>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

impl IdentityEvent {
    /// Parses a webhook body into an identity event.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the body is not a JSON object, has no
    /// string `type`, or a user event lacks `data.id` or has mistyped fields.
    pub fn parse(body: &[u8]) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_slice(body)?;
        let Value::Object(mut envelope) = value else { return Err(ParseError::NotAnObject) };

        let event_type = envelope
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ParseError::MissingType)?
            .to_string();

        let data = match envelope.remove("data") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let id = data.get("id").and_then(Value::as_str).map(ExternalId::from);

        match event_type.as_str() {
            USER_CREATED => {
                let id = require_id(id, &event_type)?;
                let fields = profile_fields(data, &event_type)?;
                Ok(Self::Created(UserCreated {
                    id,
                    email_addresses: fields.email_addresses.unwrap_or_default(),
                    username: fields.username,
                    first_name: fields.first_name,
                    last_name: fields.last_name,
                    image_url: fields.image_url,
                }))
            },
            USER_UPDATED => {
                let id = require_id(id, &event_type)?;
                let fields = profile_fields(data, &event_type)?;
                Ok(Self::Updated(UserUpdated {
                    id,
                    username: fields.username,
                    first_name: fields.first_name,
                    last_name: fields.last_name,
                    image_url: fields.image_url,
                }))
            },
            USER_DELETED => Ok(Self::Deleted(UserDeleted { id: require_id(id, &event_type)? })),
            _ => Ok(Self::Other { event_type, id }),
        }
    }

    /// Returns the event type string as delivered.
    pub fn event_type(&self) -> &str {
        match self {
            Self::Created(_) => USER_CREATED,
            Self::Updated(_) => USER_UPDATED,
            Self::Deleted(_) => USER_DELETED,
            Self::Other { event_type, .. } => event_type,
        }
    }

    /// Returns the provider user ID the event refers to, if any.
    pub fn external_id(&self) -> Option<&ExternalId> {
        match self {
            Self::Created(e) => Some(&e.id),
            Self::Updated(e) => Some(&e.id),
            Self::Deleted(e) => Some(&e.id),
            Self::Other { id, .. } => id.as_ref(),
        }
    }
}

impl UserCreated {
    /// Builds the normalized create input.
    ///
    /// Returns `None` when the event carries no email address at all; the
    /// first address is used otherwise, and absent optional fields become
    /// empty strings.
    pub fn into_new_user(self) -> Option<NewUser> {
        let first = self.email_addresses.into_iter().next()?;

        Some(NewUser {
            clerk_id: self.id,
            email: first.email_address.unwrap_or_default(),
            username: self.username.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            photo: self.image_url.unwrap_or_default(),
        })
    }
}

impl UserUpdated {
    /// Splits the event into the target ID and a partial update.
    pub fn into_update(self) -> (ExternalId, UserUpdate) {
        let update = UserUpdate {
            first_name: self.first_name,
            last_name: self.last_name,
            username: self.username,
            photo: self.image_url,
        };
        (self.id, update)
    }
}

fn require_id(id: Option<ExternalId>, event_type: &str) -> Result<ExternalId, ParseError> {
    id.ok_or_else(|| ParseError::MissingField {
        event_type: event_type.to_string(),
        field: "data.id",
    })
}

fn profile_fields(data: Map<String, Value>, event_type: &str) -> Result<ProfileFields, ParseError> {
    serde_json::from_value(Value::Object(data))
        .map_err(|source| ParseError::MalformedData { event_type: event_type.to_string(), source })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: &Value) -> Result<IdentityEvent, ParseError> {
        IdentityEvent::parse(value.to_string().as_bytes())
    }

    #[test]
    fn created_event_defaults_absent_fields_to_empty() {
        let event = parse(&json!({
            "type": "user.created",
            "data": {"id": "u1", "email_addresses": [{"email_address": "a@b.com"}]}
        }))
        .unwrap();

        let IdentityEvent::Created(created) = event else { panic!("expected created event") };
        let user = created.into_new_user().unwrap();

        assert_eq!(user, NewUser {
            clerk_id: ExternalId::from("u1"),
            email: "a@b.com".into(),
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            photo: String::new(),
        });
    }

    #[test]
    fn created_event_uses_first_email_and_profile_fields() {
        let event = parse(&json!({
            "type": "user.created",
            "data": {
                "id": "user_2x",
                "email_addresses": [
                    {"email_address": "first@example.com", "id": "idn_1"},
                    {"email_address": "second@example.com", "id": "idn_2"}
                ],
                "username": "ada",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "image_url": "https://img.example.com/ada.png"
            }
        }))
        .unwrap();

        let IdentityEvent::Created(created) = event else { panic!("expected created event") };
        let user = created.into_new_user().unwrap();

        assert_eq!(user.email, "first@example.com");
        assert_eq!(user.username, "ada");
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.last_name, "Lovelace");
        assert_eq!(user.photo, "https://img.example.com/ada.png");
    }

    #[test]
    fn created_event_with_null_fields_is_accepted() {
        let event = parse(&json!({
            "type": "user.created",
            "data": {"id": "u1", "email_addresses": null, "username": null, "first_name": null}
        }))
        .unwrap();

        let IdentityEvent::Created(created) = event else { panic!("expected created event") };
        assert!(created.email_addresses.is_empty());
        assert!(created.into_new_user().is_none());
    }

    #[test]
    fn created_event_without_emails_yields_no_new_user() {
        let event = parse(&json!({"type": "user.created", "data": {"id": "u1", "email_addresses": []}}))
            .unwrap();

        let IdentityEvent::Created(created) = event else { panic!("expected created event") };
        assert!(created.into_new_user().is_none());
    }

    #[test]
    fn updated_event_keeps_absent_fields_unset() {
        let event = parse(&json!({
            "type": "user.updated",
            "data": {"id": "u1", "first_name": "New"}
        }))
        .unwrap();

        let IdentityEvent::Updated(updated) = event else { panic!("expected updated event") };
        let (id, update) = updated.into_update();

        assert_eq!(id, ExternalId::from("u1"));
        assert_eq!(update, UserUpdate { first_name: Some("New".into()), ..Default::default() });
    }

    #[test]
    fn deleted_event_carries_id() {
        let event =
            parse(&json!({"type": "user.deleted", "data": {"id": "u9", "deleted": true}})).unwrap();

        assert_eq!(event, IdentityEvent::Deleted(UserDeleted { id: ExternalId::from("u9") }));
        assert_eq!(event.event_type(), USER_DELETED);
    }

    #[test]
    fn user_events_require_data_id() {
        for event_type in [USER_CREATED, USER_UPDATED, USER_DELETED] {
            let err = parse(&json!({"type": event_type, "data": {}})).unwrap_err();
            assert!(
                matches!(err, ParseError::MissingField { field: "data.id", .. }),
                "{event_type} should require data.id, got {err}"
            );
        }
    }

    #[test]
    fn unknown_type_becomes_other() {
        let event =
            parse(&json!({"type": "session.created", "data": {"id": "sess_1"}})).unwrap();

        assert_eq!(event, IdentityEvent::Other {
            event_type: "session.created".into(),
            id: Some(ExternalId::from("sess_1")),
        });
        assert_eq!(event.external_id().map(ExternalId::as_str), Some("sess_1"));
    }

    #[test]
    fn missing_type_rejected() {
        assert!(matches!(parse(&json!({"data": {}})), Err(ParseError::MissingType)));
        assert!(matches!(parse(&json!({"type": 7})), Err(ParseError::MissingType)));
    }

    #[test]
    fn non_object_payload_rejected() {
        assert!(matches!(parse(&json!([1, 2, 3])), Err(ParseError::NotAnObject)));
        assert!(matches!(IdentityEvent::parse(b"not json"), Err(ParseError::InvalidJson(_))));
    }

    #[test]
    fn mistyped_profile_field_is_malformed() {
        let err = parse(&json!({"type": "user.updated", "data": {"id": "u1", "username": 42}}))
            .unwrap_err();
        assert!(matches!(err, ParseError::MalformedData { .. }));
    }
}
