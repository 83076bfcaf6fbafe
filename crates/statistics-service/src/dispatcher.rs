//! # Statistics Event Dispatcher
//!
//! Query RPCs plus the fire-and-forget domain events that feed the
//! counters. The event payloads of `USER_REGISTERED_EVENT` and
//! `USER_UPDATED_EVENT` are carried but unused: only the fact that the
//! event happened is counted.

use crate::repository::StatisticsRepository;
use crate::schemas::{StatsQuery, TimelineResponse, TotalUpdatesResponse, TotalUsersResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_bus::{HandlerError, HandlerRegistry};
use std::sync::Arc;
use tracing::info;

/// RPC: total registered users.
pub const TOTAL_USERS_RPC: &str = "TOTAL_USERS_RPC";
/// RPC: total user updates.
pub const TOTAL_UPDATES_RPC: &str = "TOTAL_UPDATES_RPC";
/// RPC: registrations within the trailing 24 hours.
pub const REGISTERED_LAST_24_RPC: &str = "REGISTERED_LAST_24_RPC";
/// Fire-and-forget: a user registered somewhere on the platform.
pub const USER_REGISTERED_EVENT: &str = "USER_REGISTERED_EVENT";
/// Fire-and-forget: a user record was updated.
pub const USER_UPDATED_EVENT: &str = "USER_UPDATED_EVENT";

/// Events handled by the statistics worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "payload")]
pub enum StatsEvent {
    /// `TOTAL_USERS_RPC`
    #[serde(rename = "TOTAL_USERS_RPC")]
    TotalUsers(StatsQuery),
    /// `TOTAL_UPDATES_RPC`
    #[serde(rename = "TOTAL_UPDATES_RPC")]
    TotalUpdates(StatsQuery),
    /// `REGISTERED_LAST_24_RPC`
    #[serde(rename = "REGISTERED_LAST_24_RPC")]
    RegisteredLast24h(StatsQuery),
    /// `USER_REGISTERED_EVENT`
    #[serde(rename = "USER_REGISTERED_EVENT")]
    UserRegistered(Value),
    /// `USER_UPDATED_EVENT`
    #[serde(rename = "USER_UPDATED_EVENT")]
    UserUpdated(Value),
}

impl StatsEvent {
    /// The wire event type of this variant.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TotalUsers(_) => TOTAL_USERS_RPC,
            Self::TotalUpdates(_) => TOTAL_UPDATES_RPC,
            Self::RegisteredLast24h(_) => REGISTERED_LAST_24_RPC,
            Self::UserRegistered(_) => USER_REGISTERED_EVENT,
            Self::UserUpdated(_) => USER_UPDATED_EVENT,
        }
    }
}

/// Resolves [`StatsEvent`]s against the injected counters.
pub struct EventDispatcher {
    repository: Arc<StatisticsRepository>,
}

impl EventDispatcher {
    /// Create a dispatcher over an injected repository.
    pub fn new(repository: Arc<StatisticsRepository>) -> Self {
        Self { repository }
    }

    /// Handle one event, returning the reply data for RPC-style events.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the reply cannot be encoded.
    pub async fn handle(&self, event: StatsEvent) -> Result<Value, HandlerError> {
        let encode = |value: Result<Value, serde_json::Error>| {
            value.map_err(|e| HandlerError::failed(format!("failed to encode reply: {e}")))
        };

        match event {
            StatsEvent::TotalUsers(_) => {
                let total_users = self.repository.total_users();
                info!(total_users = total_users, "total users requested");
                encode(serde_json::to_value(TotalUsersResponse { total_users }))
            }
            StatsEvent::TotalUpdates(_) => {
                let total_updates = self.repository.total_updates();
                info!(total_updates = total_updates, "total updates requested");
                encode(serde_json::to_value(TotalUpdatesResponse { total_updates }))
            }
            StatsEvent::RegisteredLast24h(_) => {
                let registered_last_24h = self.repository.registered_last_24h();
                info!(
                    registered_last_24h = registered_last_24h,
                    "last-24h registrations requested"
                );
                encode(serde_json::to_value(TimelineResponse {
                    registered_last_24h,
                }))
            }
            StatsEvent::UserRegistered(_) => {
                self.repository.increment_users();
                Ok(Value::Null)
            }
            StatsEvent::UserUpdated(_) => {
                self.repository.increment_updates();
                Ok(Value::Null)
            }
        }
    }

    /// Build the handler registry the consumer loop runs against.
    #[must_use]
    pub fn registry(self: Arc<Self>) -> HandlerRegistry {
        let totals = Arc::clone(&self);
        let updates = Arc::clone(&self);
        let timeline = Arc::clone(&self);
        let registered = Arc::clone(&self);
        let updated = self;

        HandlerRegistry::new()
            .on(TOTAL_USERS_RPC, move |payload: StatsQuery| {
                let dispatcher = Arc::clone(&totals);
                async move { dispatcher.handle(StatsEvent::TotalUsers(payload)).await }
            })
            .on(TOTAL_UPDATES_RPC, move |payload: StatsQuery| {
                let dispatcher = Arc::clone(&updates);
                async move { dispatcher.handle(StatsEvent::TotalUpdates(payload)).await }
            })
            .on(REGISTERED_LAST_24_RPC, move |payload: StatsQuery| {
                let dispatcher = Arc::clone(&timeline);
                async move {
                    dispatcher
                        .handle(StatsEvent::RegisteredLast24h(payload))
                        .await
                }
            })
            .on(USER_REGISTERED_EVENT, move |payload: Value| {
                let dispatcher = Arc::clone(&registered);
                async move { dispatcher.handle(StatsEvent::UserRegistered(payload)).await }
            })
            .on(USER_UPDATED_EVENT, move |payload: Value| {
                let dispatcher = Arc::clone(&updated);
                async move { dispatcher.handle(StatsEvent::UserUpdated(payload)).await }
            })
    }
}
