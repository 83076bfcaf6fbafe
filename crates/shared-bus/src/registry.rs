//! # Event Handler Registry
//!
//! Maps event-type strings to async handlers. Each service builds its own
//! registry at startup from its typed event enum; the consumer loop only
//! sees the string-keyed surface.

use crate::error::HandlerError;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;

/// Outcome of one handler invocation: the reply data for RPC-style events,
/// [`Value::Null`] for fire-and-forget ones.
pub type HandlerResult = Result<Value, HandlerError>;

type BoxedHandler = Box<dyn Fn(Value) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Registry of event handlers owned by one service.
///
/// Typed registration via [`HandlerRegistry::on`] pins the payload shape of
/// each event at compile time; the raw payload is deserialized before the
/// handler runs, and mismatches surface as
/// [`HandlerError::InvalidPayload`].
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, BoxedHandler>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed handler for an event type, replacing any previous
    /// registration.
    #[must_use]
    pub fn on<P, R, F, Fut>(mut self, event_type: &str, handler: F) -> Self
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    {
        let registered_type = event_type.to_string();
        let boxed: BoxedHandler = Box::new(move |payload: Value| -> BoxFuture<'static, HandlerResult> {
            match serde_json::from_value::<P>(payload) {
                Ok(typed) => {
                    let fut = handler(typed);
                    Box::pin(async move {
                        let result = fut.await?;
                        serde_json::to_value(result).map_err(|e| {
                            HandlerError::failed(format!("failed to encode handler result: {e}"))
                        })
                    })
                }
                Err(source) => {
                    let event_type = registered_type.clone();
                    Box::pin(async move {
                        Err(HandlerError::InvalidPayload { event_type, source })
                    })
                }
            }
        });
        self.handlers.insert(event_type.to_string(), boxed);
        self
    }

    /// Invoke the handler registered for `event_type`, if any.
    ///
    /// `None` means no handler is registered - expected on shared channels,
    /// not an error.
    pub async fn dispatch(&self, event_type: &str, payload: Value) -> Option<HandlerResult> {
        let handler = self.handlers.get(event_type)?;
        Some(handler(payload).await)
    }

    /// Whether a handler is registered for `event_type`.
    #[must_use]
    pub fn contains(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Number of registered event types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Greeting {
        name: String,
    }

    #[tokio::test]
    async fn test_typed_dispatch() {
        let registry = HandlerRegistry::new().on("GREET_RPC", |g: Greeting| async move {
            Ok(json!({ "greeting": format!("hello {}", g.name) }))
        });

        let result = registry
            .dispatch("GREET_RPC", json!({"name": "Ada"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, json!({"greeting": "hello Ada"}));
    }

    #[tokio::test]
    async fn test_unregistered_event_type() {
        let registry = HandlerRegistry::new();
        assert!(registry.dispatch("UNKNOWN", json!({})).await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_a_handler_error() {
        let registry = HandlerRegistry::new()
            .on("GREET_RPC", |g: Greeting| async move { Ok(json!(g.name)) });

        let result = registry
            .dispatch("GREET_RPC", json!({"nom": "Ada"}))
            .await
            .unwrap();
        assert!(matches!(
            result,
            Err(HandlerError::InvalidPayload { event_type, .. }) if event_type == "GREET_RPC"
        ));
    }

    #[tokio::test]
    async fn test_handler_failure_propagates_as_value() {
        let registry = HandlerRegistry::new().on("FAIL_RPC", |_: Value| async move {
            Err::<Value, _>(HandlerError::failed("boom"))
        });

        let result = registry.dispatch("FAIL_RPC", json!({})).await.unwrap();
        assert!(matches!(result, Err(HandlerError::Failed(msg)) if msg == "boom"));
    }

    #[tokio::test]
    async fn test_fire_and_forget_handler_returns_null() {
        let registry = HandlerRegistry::new()
            .on("PING_EVENT", |_: Value| async move { Ok::<(), _>(()) });

        let result = registry.dispatch("PING_EVENT", json!({})).await.unwrap();
        assert_eq!(result.unwrap(), Value::Null);
    }
}
