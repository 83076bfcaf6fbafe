//! In-memory user store.
//!
//! Owned explicitly and injected into the dispatcher at construction, so
//! tests instantiate isolated stores instead of sharing process-wide state.

use crate::schemas::{User, UserCreate, UserFilter, UserUpdate};
use chrono::Utc;
use parking_lot::RwLock;
use tracing::info;

#[derive(Default)]
struct Store {
    users: Vec<User>,
    updates: u64,
}

/// In-memory user collection with linear filters.
#[derive(Default)]
pub struct UserRepository {
    inner: RwLock<Store>,
}

impl UserRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new user with a sequential id and fresh timestamps.
    pub fn create(&self, new_user: UserCreate) -> User {
        let mut store = self.inner.write();
        let now = Utc::now();
        let user = User {
            id: store.users.len() as u64 + 1,
            name: new_user.name,
            surname: new_user.surname,
            dni: new_user.dni,
            address: new_user.address,
            created_at: now,
            updated_at: now,
        };
        store.users.push(user.clone());
        info!(id = user.id, name = %user.name, "user created");
        user
    }

    /// All users matching the filter (equality on each provided field).
    pub fn list(&self, filter: &UserFilter) -> Vec<User> {
        let store = self.inner.read();
        let matched: Vec<User> = store
            .users
            .iter()
            .filter(|user| {
                filter.name.as_ref().is_none_or(|v| &user.name == v)
                    && filter.surname.as_ref().is_none_or(|v| &user.surname == v)
                    && filter.dni.as_ref().is_none_or(|v| &user.dni == v)
            })
            .cloned()
            .collect();
        info!(matched = matched.len(), "listed users");
        matched
    }

    /// Patch an existing user's provided fields and bump `updated_at`.
    /// Returns `None` when no user has the given id.
    pub fn update(&self, changes: &UserUpdate) -> Option<User> {
        let mut store = self.inner.write();
        let user = store.users.iter_mut().find(|u| u.id == changes.id)?;

        if let Some(name) = &changes.name {
            user.name = name.clone();
        }
        if let Some(surname) = &changes.surname {
            user.surname = surname.clone();
        }
        if let Some(dni) = &changes.dni {
            user.dni = dni.clone();
        }
        if let Some(address) = &changes.address {
            user.address = address.clone();
        }
        user.updated_at = Utc::now();
        let updated = user.clone();

        store.updates += 1;
        info!(id = updated.id, "user updated");
        Some(updated)
    }

    /// How many updates have been applied since startup.
    #[must_use]
    pub fn updates_count(&self) -> u64 {
        self.inner.read().updates
    }

    /// Number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().users.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().users.is_empty()
    }
}
