use serde::{Deserialize, Serialize};

// User identity = the uid assigned by the auth provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Derive the id of a direct channel from its two participants.
///
/// The id is the sorted pair of user ids, so both participants resolve
/// the same conversation regardless of who opens it first.
pub fn direct_channel_id(a: &UserId, b: &UserId) -> ChannelId {
    if a.0 < b.0 {
        ChannelId(format!("{}/{}", a.0, b.0))
    } else {
        ChannelId(format!("{}/{}", b.0, a.0))
    }
}

/// Author snapshot embedded in every stored message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    pub avatar: String,
}

/// A message carries either text content or a media download URL,
/// never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MessageBody {
    #[serde(rename = "content")]
    Text(String),
    #[serde(rename = "image")]
    Image(String),
}

impl MessageBody {
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageBody::Text(s) => Some(s),
            MessageBody::Image(_) => None,
        }
    }
}

/// A stored chat message. Immutable once written; the millisecond
/// timestamp doubles as the display key within a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub timestamp: i64,
    pub user: Author,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Message {
    pub fn text(timestamp: i64, user: Author, content: impl Into<String>) -> Self {
        Self {
            timestamp,
            user,
            body: MessageBody::Text(content.into()),
        }
    }

    pub fn image(timestamp: i64, user: Author, url: impl Into<String>) -> Self {
        Self {
            timestamp,
            user,
            body: MessageBody::Image(url.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ChannelKind {
    #[default]
    Public,
    Direct,
}

/// Creator snapshot stored with a public channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Creator {
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Creator>,
    #[serde(skip)]
    pub kind: ChannelKind,
}

impl Channel {
    pub fn public(
        id: impl Into<String>,
        name: impl Into<String>,
        details: impl Into<String>,
        created_by: Option<Creator>,
    ) -> Self {
        Self {
            id: ChannelId(id.into()),
            name: name.into(),
            details: details.into(),
            created_by,
            kind: ChannelKind::Public,
        }
    }

    /// A direct conversation presented as a channel. The id is derived
    /// from the participant pair and the name is the peer's display name.
    pub fn direct(id: ChannelId, peer_name: impl Into<String>) -> Self {
        Self {
            id,
            name: peer_name.into(),
            details: String::new(),
            created_by: None,
            kind: ChannelKind::Direct,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.kind == ChannelKind::Direct
    }

    /// Value stored under `users/{uid}/starred/{channelId}`. The id is
    /// the storage key, so it is not repeated in the snapshot.
    pub fn starred_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "details": self.details,
            "createdBy": self.created_by,
        })
    }

    /// Rebuild a channel from a starred snapshot keyed by `id`.
    pub fn from_starred_snapshot(id: &str, value: &serde_json::Value) -> Self {
        let created_by = value
            .get("createdBy")
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        Self {
            id: ChannelId(id.to_string()),
            name: value
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            details: value
                .get("details")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            created_by,
            kind: ChannelKind::Public,
        }
    }
}

/// Profile entry stored under `users/{uid}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(skip)]
    pub uid: UserId,
    pub name: String,
    #[serde(default)]
    pub avatar_photo: String,
}

/// One entry in the "currently typing" set of a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingUser {
    pub id: UserId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_channel_id_is_order_independent() {
        let a = UserId::from("alice-uid");
        let b = UserId::from("bob-uid");
        assert_eq!(direct_channel_id(&a, &b), direct_channel_id(&b, &a));
        assert_eq!(direct_channel_id(&a, &b).as_str(), "alice-uid/bob-uid");
    }

    #[test]
    fn message_serializes_with_content_xor_image() {
        let author = Author {
            id: UserId::from("u1"),
            name: "Alice".to_string(),
            avatar: "http://a".to_string(),
        };
        let text = serde_json::to_value(Message::text(42, author.clone(), "hello")).unwrap();
        assert_eq!(text["content"], "hello");
        assert!(text.get("image").is_none());
        assert_eq!(text["user"]["name"], "Alice");

        let image = serde_json::to_value(Message::image(43, author, "http://img")).unwrap();
        assert_eq!(image["image"], "http://img");
        assert!(image.get("content").is_none());
    }

    #[test]
    fn message_roundtrips_through_json() {
        let author = Author {
            id: UserId::from("u1"),
            name: "Alice".to_string(),
            avatar: String::new(),
        };
        let msg = Message::text(7, author, "hi");
        let value = serde_json::to_value(&msg).unwrap();
        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn starred_snapshot_roundtrip() {
        let channel = Channel::public(
            "c1",
            "general",
            "everything",
            Some(Creator {
                name: "Alice".to_string(),
                avatar: "http://a".to_string(),
            }),
        );
        let snapshot = channel.starred_snapshot();
        let back = Channel::from_starred_snapshot("c1", &snapshot);
        assert_eq!(back, channel);
    }
}
