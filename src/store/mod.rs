mod schema;
mod sqlite;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    error::ChatResult,
    models::{ChatMessage, Conversation, ConversationId, GroupChat, Membership, User},
};

pub use sqlite::SqliteStore;

/// Durable storage for users, chats, memberships and messages.
///
/// Lookups of absent rows return `None`/empty; the caller decides whether
/// that is an error. Writes that reference absent users or groups fail with
/// the matching `ChatError`.
#[async_trait]
pub trait ChatStore: Send + Sync + 'static {
    async fn find_user(&self, handle: &str) -> ChatResult<Option<User>>;

    async fn list_users(&self) -> ChatResult<Vec<User>>;

    async fn create_user(&self, user: &User) -> ChatResult<User>;

    async fn update_display_name(&self, handle: &str, display_name: &str) -> ChatResult<User>;

    /// Removes the user together with their memberships, private chats and
    /// sent messages. Returns `false` if no such user existed.
    async fn delete_user(&self, handle: &str) -> ChatResult<bool>;

    /// Returns the id of the one private chat between `a` and `b`, creating
    /// it if this is first contact.
    async fn find_or_create_private_chat(&self, a: &str, b: &str) -> ChatResult<i64>;

    async fn private_chat_exists(&self, a: &str, b: &str) -> ChatResult<bool>;

    async fn create_message_private(
        &self,
        content: &str,
        sender: &User,
        recipient: &User,
        created: OffsetDateTime,
    ) -> ChatResult<ChatMessage>;

    async fn find_group(&self, name: &str) -> ChatResult<Option<GroupChat>>;

    /// Inserts the group and its memberships in one transaction.
    async fn create_group(&self, name: &str, members: &[Membership]) -> ChatResult<GroupChat>;

    async fn create_message_group(
        &self,
        content: &str,
        sender: &User,
        group: &GroupChat,
        created: OffsetDateTime,
    ) -> ChatResult<ChatMessage>;

    async fn group_members(&self, group: &GroupChat) -> ChatResult<Vec<Membership>>;

    /// Returns `false` if the user already was a member.
    async fn add_group_member(&self, group: &GroupChat, member: &Membership) -> ChatResult<bool>;

    /// Returns `false` if the user was not a member.
    async fn remove_group_member(&self, group: &GroupChat, handle: &str) -> ChatResult<bool>;

    /// One entry per private chat and group the user takes part in, each
    /// with its most recent message if there is one. Unordered.
    async fn latest_message_per_conversation(&self, handle: &str) -> ChatResult<Vec<Conversation>>;

    /// Every message of the conversation, oldest first. Group history does
    /// not depend on when `viewer` joined.
    async fn thread_history(
        &self,
        viewer: &str,
        conversation: &ConversationId,
    ) -> ChatResult<Vec<ChatMessage>>;
}
