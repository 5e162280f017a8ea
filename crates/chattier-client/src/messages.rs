//! Ordered local log of the active channel's message stream.

use chattier_shared::types::Message;

/// Append-only view of one channel's messages.
///
/// The log is cleared before every (re-)subscription so a channel without
/// messages never shows another channel's stale entries, and rebuilt
/// entirely from the feed's replayed history. Each child-added event is
/// appended exactly once; ordering is the server-applied feed order.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.entries.push(message);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive substring search over text messages, in log
    /// order. Media messages never match.
    pub fn search(&self, query: &str) -> Vec<&Message> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|m| {
                m.body
                    .text()
                    .is_some_and(|content| content.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Number of distinct authors seen in the log, by display name.
    pub fn unique_author_count(&self) -> usize {
        let mut names: Vec<&str> = Vec::new();
        for message in &self.entries {
            if !names.contains(&message.user.name.as_str()) {
                names.push(&message.user.name);
            }
        }
        names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chattier_shared::types::{Author, UserId};

    fn author(name: &str) -> Author {
        Author {
            id: UserId::from(name),
            name: name.to_string(),
            avatar: String::new(),
        }
    }

    #[test]
    fn append_keeps_arrival_order() {
        let mut log = MessageLog::new();
        log.append(Message::text(1, author("alice"), "first"));
        log.append(Message::text(2, author("bob"), "second"));
        let bodies: Vec<_> = log.iter().map(|m| m.body.text().unwrap()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }

    #[test]
    fn search_is_case_insensitive_and_ordered() {
        let mut log = MessageLog::new();
        log.append(Message::text(1, author("alice"), "Hello world"));
        log.append(Message::text(2, author("bob"), "goodbye"));
        log.append(Message::text(3, author("alice"), "HELLO again"));

        let hits = log.search("hello");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].timestamp, 1);
        assert_eq!(hits[1].timestamp, 3);
        assert!(log.search("bye").len() == 1);
        assert!(log.search("absent").is_empty());
    }

    #[test]
    fn search_skips_media_messages() {
        let mut log = MessageLog::new();
        log.append(Message::image(1, author("alice"), "http://img/hello.png"));
        assert!(log.search("hello").is_empty());
    }

    #[test]
    fn unique_authors_counted_by_name() {
        let mut log = MessageLog::new();
        log.append(Message::text(1, author("alice"), "a"));
        log.append(Message::text(2, author("bob"), "b"));
        log.append(Message::text(3, author("alice"), "c"));
        assert_eq!(log.unique_author_count(), 2);
    }
}
