//! In-memory statistics store.
//!
//! Injected into the dispatcher at construction; no process-wide state.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::info;

#[derive(Default)]
struct Counters {
    total_users: u64,
    total_updates: u64,
    registration_timeline: Vec<DateTime<Utc>>,
}

/// Usage counters fed by domain events.
#[derive(Default)]
pub struct StatisticsRepository {
    inner: RwLock<Counters>,
}

impl StatisticsRepository {
    /// Create a zeroed repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one registration: bumps the total and appends to the
    /// timeline used by [`StatisticsRepository::registered_last_24h`].
    pub fn increment_users(&self) {
        let mut counters = self.inner.write();
        counters.total_users += 1;
        counters.registration_timeline.push(Utc::now());
        info!(total_users = counters.total_users, "total users incremented");
    }

    /// Record one user update.
    pub fn increment_updates(&self) {
        let mut counters = self.inner.write();
        counters.total_updates += 1;
        info!(total_updates = counters.total_updates, "total updates incremented");
    }

    /// Total registrations since startup.
    #[must_use]
    pub fn total_users(&self) -> u64 {
        self.inner.read().total_users
    }

    /// Total updates since startup.
    #[must_use]
    pub fn total_updates(&self) -> u64 {
        self.inner.read().total_updates
    }

    /// Registrations recorded within the trailing 24 hours.
    #[must_use]
    pub fn registered_last_24h(&self) -> u64 {
        let cutoff = Utc::now() - Duration::hours(24);
        self.inner
            .read()
            .registration_timeline
            .iter()
            .filter(|timestamp| **timestamp > cutoff)
            .count() as u64
    }

    #[cfg(test)]
    fn backdate_registration(&self, hours: i64) {
        self.inner
            .write()
            .registration_timeline
            .push(Utc::now() - Duration::hours(hours));
    }
}
