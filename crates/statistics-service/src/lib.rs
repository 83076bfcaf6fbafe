//! # Statistics Service
//!
//! Backend service keeping usage counters. Counts are fed by the domain
//! events other services broadcast (`USER_REGISTERED_EVENT`,
//! `USER_UPDATED_EVENT`) and queried through RPC-style commands
//! (`TOTAL_USERS_RPC`, `TOTAL_UPDATES_RPC`, `REGISTERED_LAST_24_RPC`).

pub mod dispatcher;
pub mod repository;
pub mod schemas;

pub use dispatcher::{
    EventDispatcher, StatsEvent, REGISTERED_LAST_24_RPC, TOTAL_UPDATES_RPC, TOTAL_USERS_RPC,
};
pub use repository::StatisticsRepository;
pub use schemas::{StatsQuery, TimelineResponse, TotalUpdatesResponse, TotalUsersResponse};
