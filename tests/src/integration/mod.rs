//! Cross-service integration flows.

pub mod flows;
pub mod gateway;
