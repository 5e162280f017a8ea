//! The user's starred channels, reconciled from `users/{uid}/starred`.

use serde_json::Value;

use chattier_shared::types::{Channel, ChannelId};

#[derive(Debug, Default)]
pub struct StarredChannels {
    channels: Vec<Channel>,
}

impl StarredChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reflect a starred snapshot appearing under the user's star set.
    pub fn apply_added(&mut self, id: &str, value: &Value) {
        let channel = Channel::from_starred_snapshot(id, value);
        if !self.channels.iter().any(|c| c.id == channel.id) {
            self.channels.push(channel);
        }
    }

    pub fn apply_removed(&mut self, id: &str) {
        self.channels.retain(|c| c.id.as_str() != id);
    }

    pub fn contains(&self, id: &ChannelId) -> bool {
        self.channels.iter().any(|c| &c.id == id)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_and_remove_by_key() {
        let mut starred = StarredChannels::new();
        starred.apply_added("c1", &json!({"name": "general", "details": "d"}));
        starred.apply_added("c2", &json!({"name": "random", "details": ""}));
        assert_eq!(starred.len(), 2);
        assert!(starred.contains(&ChannelId::from("c1")));

        starred.apply_removed("c1");
        assert!(!starred.contains(&ChannelId::from("c1")));
        assert_eq!(starred.len(), 1);
    }

    #[test]
    fn duplicate_adds_are_ignored() {
        let mut starred = StarredChannels::new();
        starred.apply_added("c1", &json!({"name": "general"}));
        starred.apply_added("c1", &json!({"name": "general"}));
        assert_eq!(starred.len(), 1);
    }
}
