//! Live set of users currently typing in the active channel.

use chattier_shared::types::{TypingUser, UserId};

/// Reconciles the per-channel typing-marker topic into a displayable
/// set. The local user's own marker is filtered out before insertion by
/// the event dispatcher; this set never contains it.
#[derive(Debug, Default)]
pub struct TypingRoster {
    users: Vec<TypingUser>,
}

impl TypingRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a marker, replacing any existing entry for the same user.
    pub fn apply_added(&mut self, user: TypingUser) {
        match self.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => self.users.push(user),
        }
    }

    /// Remove a marker by user id; unknown ids are ignored.
    pub fn apply_removed(&mut self, id: &UserId) {
        self.users.retain(|u| &u.id != id);
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }

    pub fn users(&self) -> &[TypingUser] {
        &self.users
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typing(id: &str, name: &str) -> TypingUser {
        TypingUser {
            id: UserId::from(id),
            name: name.to_string(),
        }
    }

    #[test]
    fn add_then_remove_leaves_empty_set() {
        let mut roster = TypingRoster::new();
        roster.apply_added(typing("u1", "Alice"));
        assert_eq!(roster.users().len(), 1);

        roster.apply_removed(&UserId::from("u1"));
        assert!(roster.is_empty());
    }

    #[test]
    fn reinsert_replaces_existing_entry() {
        let mut roster = TypingRoster::new();
        roster.apply_added(typing("u1", "Alice"));
        roster.apply_added(typing("u1", "Alice B"));
        assert_eq!(roster.users().len(), 1);
        assert_eq!(roster.users()[0].name, "Alice B");
    }

    #[test]
    fn removing_unknown_id_is_a_noop() {
        let mut roster = TypingRoster::new();
        roster.apply_added(typing("u1", "Alice"));
        roster.apply_removed(&UserId::from("u2"));
        assert_eq!(roster.users().len(), 1);
    }
}
