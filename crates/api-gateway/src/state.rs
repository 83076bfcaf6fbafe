//! Application state shared across handlers.

use shared_bus::Publisher;
use std::sync::Arc;

/// State injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    /// Bus publisher used for both RPC calls and fire-and-forget events.
    pub publisher: Arc<Publisher>,
}

impl AppState {
    /// Create gateway state over a bus publisher.
    #[must_use]
    pub fn new(publisher: Arc<Publisher>) -> Self {
        Self { publisher }
    }
}
