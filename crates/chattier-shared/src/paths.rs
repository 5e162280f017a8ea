//! Builders for the persisted path layout of the hosted realtime database.
//!
//! Every remote topic the client subscribes to or writes under is named
//! here; no other module assembles path strings by hand.

use crate::types::{ChannelId, UserId};

/// Well-known connectivity topic reporting boolean connected-state.
pub const CONNECTED: &str = ".info/connected";

pub const CHANNELS_ROOT: &str = "channels";
pub const MESSAGES_ROOT: &str = "messages";
pub const PRIVATE_MESSAGES_ROOT: &str = "privateMessages";
pub const TYPING_ROOT: &str = "typing";
pub const PRESENCE_ROOT: &str = "presence";
pub const USERS_ROOT: &str = "users";

pub fn channel(id: &ChannelId) -> String {
    format!("{CHANNELS_ROOT}/{id}")
}

/// Message feed of a public channel.
pub fn messages(channel: &ChannelId) -> String {
    format!("{MESSAGES_ROOT}/{channel}")
}

/// Message feed of a direct conversation.
pub fn private_messages(channel: &ChannelId) -> String {
    format!("{PRIVATE_MESSAGES_ROOT}/{channel}")
}

/// Message feed for a channel, routed by the direct flag.
pub fn message_feed(channel: &ChannelId, direct: bool) -> String {
    if direct {
        private_messages(channel)
    } else {
        messages(channel)
    }
}

/// The set of typing markers for one channel.
pub fn typing(channel: &ChannelId) -> String {
    format!("{TYPING_ROOT}/{channel}")
}

/// One user's typing marker within a channel.
pub fn typing_marker(channel: &ChannelId, user: &UserId) -> String {
    format!("{TYPING_ROOT}/{channel}/{user}")
}

pub fn presence_entry(user: &UserId) -> String {
    format!("{PRESENCE_ROOT}/{user}")
}

pub fn user(uid: &UserId) -> String {
    format!("{USERS_ROOT}/{uid}")
}

pub fn user_avatar(uid: &UserId) -> String {
    format!("{USERS_ROOT}/{uid}/avatarPhoto")
}

pub fn user_starred(uid: &UserId) -> String {
    format!("{USERS_ROOT}/{uid}/starred")
}

pub fn user_starred_channel(uid: &UserId, channel: &ChannelId) -> String {
    format!("{USERS_ROOT}/{uid}/starred/{channel}")
}

/// Blob object path for a media upload, routed by the direct flag.
pub fn upload_object(channel: &ChannelId, direct: bool, file_id: &str, ext: &str) -> String {
    let visibility = if direct { "private" } else { "public" };
    format!("chat/{visibility}/{channel}/{file_id}.{ext}")
}

/// Blob object path for a user's avatar image.
pub fn avatar_object(uid: &UserId) -> String {
    format!("avatars/users/{uid}")
}

/// Channel id of a `messages/{channelId}` feed path, if the path is one.
pub fn channel_of_message_feed(path: &str) -> Option<ChannelId> {
    path.strip_prefix("messages/")
        .map(|rest| ChannelId(rest.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_routing_honours_direct_flag() {
        let public = ChannelId::from("c1");
        let direct = ChannelId::from("a/b");
        assert_eq!(message_feed(&public, false), "messages/c1");
        assert_eq!(message_feed(&direct, true), "privateMessages/a/b");
    }

    #[test]
    fn message_feed_path_parses_back_to_channel() {
        let id = ChannelId::from("c9");
        assert_eq!(channel_of_message_feed(&messages(&id)), Some(id));
        assert_eq!(channel_of_message_feed("typing/c9"), None);
    }

    #[test]
    fn upload_object_visibility() {
        let id = ChannelId::from("c1");
        assert_eq!(
            upload_object(&id, false, "f-1", "png"),
            "chat/public/c1/f-1.png"
        );
        assert_eq!(
            upload_object(&id, true, "f-1", "jpg"),
            "chat/private/c1/f-1.jpg"
        );
    }
}
