//! # Users Event Dispatcher
//!
//! The events this service consumes, as an explicit tagged union, and the
//! dispatcher resolving them against the injected repository. The registry
//! built by [`EventDispatcher::registry`] deserializes each event's payload
//! into its typed shape before the handler runs.

use crate::mailer::Mailer;
use crate::repository::UserRepository;
use crate::schemas::{EmailRequest, UserCreate, UserFilter, UserUpdate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_bus::{HandlerError, HandlerRegistry};
use std::sync::Arc;
use tracing::warn;

/// RPC: register a new user, reply with the stored record.
pub const REGISTER_USER_RPC: &str = "REGISTER_USER_RPC";
/// RPC: list users matching a filter.
pub const LIST_USERS_RPC: &str = "LIST_USERS_RPC";
/// RPC: patch an existing user.
pub const UPDATE_USER_RPC: &str = "UPDATE_USER_RPC";
/// Fire-and-forget: send a notification email.
pub const SEND_EMAIL: &str = "SEND_EMAIL";
/// Domain event emitted by the gateway after a successful registration.
pub const USER_REGISTERED_EVENT: &str = "USER_REGISTERED_EVENT";
/// Domain event emitted by the gateway after a successful update.
pub const USER_UPDATED_EVENT: &str = "USER_UPDATED_EVENT";

/// Events handled by the users worker, each with its typed payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "payload")]
pub enum UserEvent {
    /// `REGISTER_USER_RPC`
    #[serde(rename = "REGISTER_USER_RPC")]
    RegisterUser(UserCreate),
    /// `LIST_USERS_RPC`
    #[serde(rename = "LIST_USERS_RPC")]
    ListUsers(UserFilter),
    /// `UPDATE_USER_RPC`
    #[serde(rename = "UPDATE_USER_RPC")]
    UpdateUser(UserUpdate),
    /// `SEND_EMAIL`
    #[serde(rename = "SEND_EMAIL")]
    SendEmail(EmailRequest),
}

impl UserEvent {
    /// The wire event type of this variant.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RegisterUser(_) => REGISTER_USER_RPC,
            Self::ListUsers(_) => LIST_USERS_RPC,
            Self::UpdateUser(_) => UPDATE_USER_RPC,
            Self::SendEmail(_) => SEND_EMAIL,
        }
    }
}

/// Resolves [`UserEvent`]s against the service's store and mailer.
pub struct EventDispatcher {
    repository: Arc<UserRepository>,
    mailer: Arc<dyn Mailer>,
}

impl EventDispatcher {
    /// Create a dispatcher over an injected repository and mailer.
    pub fn new(repository: Arc<UserRepository>, mailer: Arc<dyn Mailer>) -> Self {
        Self { repository, mailer }
    }

    /// Handle one event, returning the reply data for RPC-style events.
    ///
    /// A missing user on update is a business-level failure, not a
    /// transport one: it is reported inside the reply data as an `error`
    /// key, and the transport status stays `OK`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] for failures that should produce no reply.
    pub async fn handle(&self, event: UserEvent) -> Result<Value, HandlerError> {
        match event {
            UserEvent::RegisterUser(new_user) => {
                let user = self.repository.create(new_user);
                self.mailer.send_welcome(&user.name, &user.surname).await;
                serde_json::to_value(user)
                    .map_err(|e| HandlerError::failed(format!("failed to encode user: {e}")))
            }
            UserEvent::ListUsers(filter) => {
                let users = self.repository.list(&filter);
                serde_json::to_value(users)
                    .map_err(|e| HandlerError::failed(format!("failed to encode users: {e}")))
            }
            UserEvent::UpdateUser(changes) => match self.repository.update(&changes) {
                Some(user) => serde_json::to_value(user)
                    .map_err(|e| HandlerError::failed(format!("failed to encode user: {e}"))),
                None => {
                    warn!(id = changes.id, "user not found");
                    Ok(json!({"error": "User not found"}))
                }
            },
            UserEvent::SendEmail(request) => {
                self.mailer
                    .send_welcome(
                        request.name.as_deref().unwrap_or_default(),
                        request.surname.as_deref().unwrap_or_default(),
                    )
                    .await;
                Ok(Value::Null)
            }
        }
    }

    /// Build the handler registry the consumer loop runs against.
    #[must_use]
    pub fn registry(self: Arc<Self>) -> HandlerRegistry {
        let register = Arc::clone(&self);
        let list = Arc::clone(&self);
        let update = Arc::clone(&self);
        let email = self;

        HandlerRegistry::new()
            .on(REGISTER_USER_RPC, move |payload: UserCreate| {
                let dispatcher = Arc::clone(&register);
                async move { dispatcher.handle(UserEvent::RegisterUser(payload)).await }
            })
            .on(LIST_USERS_RPC, move |payload: UserFilter| {
                let dispatcher = Arc::clone(&list);
                async move { dispatcher.handle(UserEvent::ListUsers(payload)).await }
            })
            .on(UPDATE_USER_RPC, move |payload: UserUpdate| {
                let dispatcher = Arc::clone(&update);
                async move { dispatcher.handle(UserEvent::UpdateUser(payload)).await }
            })
            .on(SEND_EMAIL, move |payload: EmailRequest| {
                let dispatcher = Arc::clone(&email);
                async move { dispatcher.handle(UserEvent::SendEmail(payload)).await }
            })
    }
}
