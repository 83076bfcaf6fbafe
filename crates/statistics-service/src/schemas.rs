//! Statistics query and response payload shapes.

use serde::{Deserialize, Serialize};

/// Empty request payload carried by the statistics RPC queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsQuery {}

/// Reply of `TOTAL_USERS_RPC`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalUsersResponse {
    pub total_users: u64,
}

/// Reply of `TOTAL_UPDATES_RPC`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalUpdatesResponse {
    pub total_updates: u64,
}

/// Reply of `REGISTERED_LAST_24_RPC`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineResponse {
    pub registered_last_24h: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stats_query_accepts_empty_object() {
        let query: StatsQuery = serde_json::from_value(json!({})).unwrap();
        let _ = query;
    }

    #[test]
    fn test_response_field_names() {
        let value = serde_json::to_value(TotalUsersResponse { total_users: 3 }).unwrap();
        assert_eq!(value, json!({"total_users": 3}));
    }
}
