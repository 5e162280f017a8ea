//! List of public channels, reconciled from the `channels` topic.

use serde_json::Value;
use tracing::warn;

use chattier_shared::error::ValidationError;
use chattier_shared::types::{Channel, ChannelId};

#[derive(Debug, Default)]
pub struct ChannelDirectory {
    channels: Vec<Channel>,
}

impl ChannelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reflect a `channels` child-added event. Returns the channel id on
    /// success so the caller can wire up its notification feed.
    pub fn apply_added(&mut self, value: &Value) -> Option<ChannelId> {
        let channel: Channel = match serde_json::from_value(value.clone()) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "malformed channel entry");
                return None;
            }
        };
        if self.channels.iter().any(|c| c.id == channel.id) {
            return None;
        }
        let id = channel.id.clone();
        self.channels.push(channel);
        Some(id)
    }

    pub fn contains(&self, id: &ChannelId) -> bool {
        self.channels.iter().any(|c| &c.id == id)
    }

    pub fn get(&self, id: &ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| &c.id == id)
    }

    pub fn first(&self) -> Option<&Channel> {
        self.channels.first()
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

/// Add-channel form input.
#[derive(Debug, Clone, Default)]
pub struct ChannelForm {
    pub name: String,
    pub details: String,
}

impl ChannelForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() || self.details.is_empty() {
            return Err(ValidationError::EmptyFields);
        }
        Ok(())
    }
}
