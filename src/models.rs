use serde::Serialize;
use time::OffsetDateTime;

use crate::error::{ChatError, ChatResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub handle: String,
    pub display_name: String,
}

impl User {
    pub fn new(handle: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChat {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub user: User,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub content: String,
    pub sender: User,
    pub created: OffsetDateTime,
    // no edit path yet; kept so the schema round-trips
    pub modified: Option<OffsetDateTime>,
}

/// Who a message was addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressee {
    Private { recipient: User },
    Group { group: GroupChat },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub message: Message,
    pub addressee: Addressee,
}

impl ChatMessage {
    pub fn conversation_for(&self, viewer: &str) -> ConversationId {
        match &self.addressee {
            Addressee::Private { recipient } => {
                if recipient.handle == viewer {
                    ConversationId::Private(self.message.sender.handle.clone())
                } else {
                    ConversationId::Private(recipient.handle.clone())
                }
            }
            Addressee::Group { group } => ConversationId::Group(group.name.clone()),
        }
    }
}

/// A conversation as seen from one user: the counterpart's handle for a
/// private chat, the group name for a group chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConversationId {
    Private(String),
    Group(String),
}

impl ConversationId {
    /// Value of the `chat-target` attribute that thread views and pushed
    /// bubbles share.
    pub fn key(&self) -> String {
        match self {
            ConversationId::Private(handle) => format!("user:{handle}"),
            ConversationId::Group(name) => format!("group:{name}"),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ConversationId::Private(handle) => handle,
            ConversationId::Group(name) => name,
        }
    }
}

/// One row of a user's chat list before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub latest: Option<Message>,
}

pub(crate) fn to_micros(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000) as i64
}

pub(crate) fn from_micros(micros: i64) -> ChatResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .map_err(|_| ChatError::CorruptTimestamp(micros))
}

/// Lower handle first, so one unordered pair has exactly one key.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_order_independent() {
        assert_eq!(canonical_pair("bob", "alice"), ("alice", "bob"));
        assert_eq!(canonical_pair("alice", "bob"), ("alice", "bob"));
    }

    #[test]
    fn micros_survive_storage() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
            + time::Duration::microseconds(123_456);
        assert_eq!(from_micros(to_micros(at)).unwrap(), at);
    }

    #[test]
    fn private_conversation_points_at_the_other_side() {
        let msg = ChatMessage {
            message: Message {
                id: 1,
                content: "hi".to_owned(),
                sender: User::new("alice", "Alice"),
                created: OffsetDateTime::UNIX_EPOCH,
                modified: None,
            },
            addressee: Addressee::Private { recipient: User::new("bob", "Bob") },
        };
        assert_eq!(msg.conversation_for("alice"), ConversationId::Private("bob".to_owned()));
        assert_eq!(msg.conversation_for("bob"), ConversationId::Private("alice".to_owned()));
    }
}
