//! Webhook payload builders.
//!
//! Produces bodies shaped like the identity provider's user events, with
//! only the fields a test sets. Unset profile fields are omitted entirely so
//! tests exercise the empty-string defaulting path.

use serde_json::{json, Map, Value};

/// Builder for identity event bodies.
#[derive(Debug, Clone)]
pub struct UserEventBuilder {
    event_type: String,
    data: Map<String, Value>,
}

impl UserEventBuilder {
    /// Starts an event of an arbitrary type with an empty `data` object.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self { event_type: event_type.into(), data: Map::new() }
    }

    /// `user.created` for the given provider ID with no email addresses.
    pub fn created(id: &str) -> Self {
        Self::new("user.created").id(id).field("email_addresses", json!([]))
    }

    /// `user.updated` for the given provider ID.
    pub fn updated(id: &str) -> Self {
        Self::new("user.updated").id(id)
    }

    /// `user.deleted` for the given provider ID.
    pub fn deleted(id: &str) -> Self {
        Self::new("user.deleted").id(id).field("deleted", json!(true))
    }

    /// Sets `data.id`.
    pub fn id(self, id: &str) -> Self {
        self.field("id", json!(id))
    }

    /// Appends an email address.
    pub fn email(mut self, address: &str) -> Self {
        let entry = json!({
            "id": format!("idn_{}", address.len()),
            "email_address": address,
        });
        match self.data.get_mut("email_addresses") {
            Some(Value::Array(list)) => list.push(entry),
            _ => {
                self.data.insert("email_addresses".to_string(), json!([entry]));
            },
        }
        self
    }

    /// Sets `data.username`.
    pub fn username(self, username: &str) -> Self {
        self.field("username", json!(username))
    }

    /// Sets `data.first_name`.
    pub fn first_name(self, name: &str) -> Self {
        self.field("first_name", json!(name))
    }

    /// Sets `data.last_name`.
    pub fn last_name(self, name: &str) -> Self {
        self.field("last_name", json!(name))
    }

    /// Sets `data.image_url`.
    pub fn image_url(self, url: &str) -> Self {
        self.field("image_url", json!(url))
    }

    /// Sets an arbitrary `data` field.
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Removes a `data` field.
    pub fn without(mut self, key: &str) -> Self {
        self.data.remove(key);
        self
    }

    /// Builds the full event envelope.
    pub fn build(self) -> Value {
        json!({
            "object": "event",
            "type": self.event_type,
            "data": Value::Object(self.data),
        })
    }

    /// Builds the body bytes as they would arrive on the wire.
    pub fn to_body(self) -> Vec<u8> {
        self.build().to_string().into_bytes()
    }
}
