//! Connected/disconnected status of every other user.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use chattier_shared::types::{UserId, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Offline,
    Online,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Online => write!(f, "online"),
            Status::Offline => write!(f, "offline"),
        }
    }
}

/// Reconciles the global `users` roster and the `presence` set into one
/// status view. The two topics are independently subscribed and may
/// deliver in either order, so status is kept separately from the roster
/// and joined on read; a presence entry for a user whose profile has not
/// arrived yet is not lost.
#[derive(Debug, Default)]
pub struct PresenceRoster {
    users: Vec<UserProfile>,
    status: HashMap<UserId, Status>,
}

impl PresenceRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reflect a `users` child-added event. The local user is excluded
    /// by the dispatcher.
    pub fn apply_user_added(&mut self, uid: UserId, value: &Value) {
        let mut profile: UserProfile = match serde_json::from_value(value.clone()) {
            Ok(p) => p,
            Err(e) => {
                warn!(uid = %uid, error = %e, "malformed user profile");
                return;
            }
        };
        profile.uid = uid;
        if !self.users.iter().any(|u| u.uid == profile.uid) {
            self.users.push(profile);
        }
    }

    /// Reflect a presence entry appearing or vanishing.
    pub fn apply_presence(&mut self, uid: UserId, connected: bool) {
        let status = if connected {
            Status::Online
        } else {
            Status::Offline
        };
        self.status.insert(uid, status);
    }

    /// Status for a user; `offline` until a presence entry is seen.
    pub fn status(&self, uid: &UserId) -> Status {
        self.status.get(uid).copied().unwrap_or_default()
    }

    /// The roster joined with per-user status.
    pub fn users(&self) -> impl Iterator<Item = (&UserProfile, Status)> {
        self.users.iter().map(|u| (u, self.status(&u.uid)))
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn clear(&mut self) {
        self.users.clear();
        self.status.clear();
    }
}
