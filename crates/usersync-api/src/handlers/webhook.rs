//! Identity provider webhook handler.
//!
//! Authenticates the delivery, parses the event, and mirrors user lifecycle
//! changes into the user store. Newly created users get their internal ID
//! written back to the provider.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn, Span};
use usersync_core::{IdentityEvent, UserCreated, UserDeleted, UserRecord, UserUpdated};

use crate::{crypto::WebhookHeaders, error::WebhookError, AppState};

/// Body returned for handled user events.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    /// Always `"OK"`
    pub message: &'static str,
    /// The affected row, or `null` when nothing changed
    pub user: Option<UserRecord>,
}

impl SyncResponse {
    fn ok(user: Option<UserRecord>) -> Response {
        (StatusCode::OK, Json(Self { message: "OK", user })).into_response()
    }
}

/// Receives a signed identity event.
///
/// # Errors
///
/// - 400: missing signature headers, failed verification, unparseable event,
///   or a created user without email addresses
/// - 500: the store or the metadata write-back failed
#[instrument(
    name = "clerk_webhook",
    skip_all,
    fields(
        svix_id = tracing::field::Empty,
        event_type = tracing::field::Empty,
        content_length = body.len(),
    )
)]
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookError> {
    let Some(signature_headers) = WebhookHeaders::from_header_map(&headers) else {
        warn!("Webhook rejected: signature headers missing");
        return Err(WebhookError::MissingHeaders);
    };
    Span::current().record("svix_id", signature_headers.id.as_str());

    if let Err(e) = state.verifier.verify(&signature_headers, &body) {
        warn!(error = %e, "Webhook rejected: verification failed");
        return Err(e.into());
    }

    let event = IdentityEvent::parse(&body).map_err(|e| {
        warn!(error = %e, "Webhook rejected: invalid payload");
        WebhookError::from(e)
    })?;

    Span::current().record("event_type", event.event_type());
    info!(
        id = event.external_id().map(|id| id.as_str()).unwrap_or_default(),
        "Received webhook"
    );

    match event {
        IdentityEvent::Created(created) => handle_created(&state, created).await,
        IdentityEvent::Updated(updated) => handle_updated(&state, updated).await,
        IdentityEvent::Deleted(deleted) => handle_deleted(&state, deleted).await,
        IdentityEvent::Other { event_type, id } => {
            info!(
                id = id.as_ref().map(|id| id.as_str()).unwrap_or_default(),
                event_type = %event_type,
                body = %String::from_utf8_lossy(&body),
                "Ignoring unhandled event type"
            );
            Ok(StatusCode::OK.into_response())
        },
    }
}

async fn handle_created(state: &AppState, created: UserCreated) -> Result<Response, WebhookError> {
    let Some(new_user) = created.into_new_user() else {
        warn!("Webhook rejected: user.created without email addresses");
        return Err(WebhookError::NoEmailAddresses);
    };

    let clerk_id = new_user.clerk_id.clone();
    let record = state.store.create_user(new_user).await.map_err(|e| {
        error!(error = %e, kind = e.kind(), "Failed to create user");
        WebhookError::CreateUser(e)
    })?;

    match &record {
        Some(user) => {
            write_back(state, user).await?;
            info!(user_id = %user.id, "User created");
        },
        None => {
            // A redelivery may follow a failed write-back, so repeat it.
            let existing = state.store.find_user(&clerk_id).await.map_err(|e| {
                error!(error = %e, kind = e.kind(), "Failed to look up existing user");
                WebhookError::CreateUser(e)
            })?;
            match existing {
                Some(user) => {
                    write_back(state, &user).await?;
                    debug!(user_id = %user.id, "User already exists, write-back repeated");
                },
                None => debug!("User already exists but is gone now, skipping write-back"),
            }
        },
    }

    Ok(SyncResponse::ok(record))
}

async fn write_back(state: &AppState, user: &UserRecord) -> Result<(), WebhookError> {
    state.provider.set_user_metadata(&user.clerk_id, user.id).await.map_err(|e| {
        error!(error = %e, user_id = %user.id, "Failed to write back user metadata");
        WebhookError::WriteBack(e)
    })
}

async fn handle_updated(state: &AppState, updated: UserUpdated) -> Result<Response, WebhookError> {
    let (clerk_id, update) = updated.into_update();
    let record = state.store.update_user(&clerk_id, update).await?;

    match &record {
        Some(user) => info!(user_id = %user.id, "User updated"),
        None => debug!("No stored user to update"),
    }

    Ok(SyncResponse::ok(record))
}

async fn handle_deleted(state: &AppState, deleted: UserDeleted) -> Result<Response, WebhookError> {
    let record = state.store.delete_user(&deleted.id).await?;

    match &record {
        Some(user) => info!(user_id = %user.id, "User deleted"),
        None => debug!("No stored user to delete"),
    }

    Ok(SyncResponse::ok(record))
}
