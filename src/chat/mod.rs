//! Request-level orchestration: every user action reads and writes the chat
//! store, answers the requester directly and pushes incremental updates to
//! whoever else is connected.

mod group;
mod list;
mod private;

use std::sync::Arc;

use tracing::info;

use crate::{
    error::{ChatError, ChatResult},
    live::{FanOut, Registry},
    models::{ConversationId, GroupChat, User},
    store::ChatStore,
    views::{ChatSummary, ThreadView},
};

pub use group::CreatedGroup;

const MAX_HANDLE_LEN: usize = 32;
const MAX_NAME_LEN: usize = 64;
const MAX_CONTENT_LEN: usize = 4000;

/// What the requester gets back: the refreshed thread and its chat-list row.
#[derive(Debug, Clone)]
pub struct Reply {
    pub thread: ThreadView,
    pub summary: ChatSummary,
}

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    fanout: FanOut,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, registry: Arc<dyn Registry>) -> Self {
        Self {
            store,
            fanout: FanOut::new(registry),
        }
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        self.fanout.registry()
    }

    pub(crate) async fn user(&self, handle: &str) -> ChatResult<User> {
        self.store
            .find_user(handle)
            .await?
            .ok_or_else(|| ChatError::UnknownUser(handle.to_owned()))
    }

    pub(crate) async fn group(&self, name: &str) -> ChatResult<GroupChat> {
        self.store
            .find_group(name)
            .await?
            .ok_or_else(|| ChatError::UnknownGroup(name.to_owned()))
    }

    pub async fn register_user(&self, handle: &str, display_name: &str) -> ChatResult<User> {
        let handle = handle.trim();
        let display_name = display_name.trim();
        check_handle(handle)?;
        check_name(display_name, "display name must be 1 to 64 characters")?;

        let user = self.store.create_user(&User::new(handle, display_name)).await?;
        info!(handle = %user.handle, "user registered");
        Ok(user)
    }

    pub async fn user_exists(&self, handle: &str) -> ChatResult<bool> {
        Ok(self.store.find_user(handle.trim()).await?.is_some())
    }

    pub async fn login(&self, handle: &str) -> ChatResult<User> {
        self.user(handle.trim()).await
    }

    pub async fn update_display_name(&self, handle: &str, display_name: &str) -> ChatResult<User> {
        let display_name = display_name.trim();
        check_name(display_name, "display name must be 1 to 64 characters")?;
        self.store.update_display_name(handle, display_name).await
    }

    pub async fn delete_user(&self, handle: &str) -> ChatResult<()> {
        if !self.store.delete_user(handle).await? {
            return Err(ChatError::UnknownUser(handle.to_owned()));
        }
        let closed = self.registry().disconnect(handle);
        info!(handle, closed, "user deleted");
        Ok(())
    }

    pub async fn list_users(&self) -> ChatResult<Vec<User>> {
        self.store.list_users().await
    }

    /// Thread view of an existing conversation; nothing is created.
    pub async fn open_thread(&self, viewer: &str, conversation: &ConversationId) -> ChatResult<ThreadView> {
        let title = match conversation {
            ConversationId::Private(handle) => {
                let counterpart = self.user(handle).await?;
                if !self.store.private_chat_exists(viewer, &counterpart.handle).await? {
                    return Err(ChatError::UnknownConversation(conversation.key()));
                }
                counterpart.display_name
            }
            ConversationId::Group(name) => {
                let group = self.group(name).await?;
                self.require_member(&group, viewer).await?;
                group.name
            }
        };
        let history = self.store.thread_history(viewer, conversation).await?;
        Ok(ThreadView::new(viewer, conversation.clone(), title, &history))
    }
}

fn check_handle(handle: &str) -> ChatResult<()> {
    let valid = !handle.is_empty()
        && handle.len() <= MAX_HANDLE_LEN
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ChatError::InvalidInput(
            "username must be 1 to 32 letters, digits, '_', '-' or '.'",
        ))
    }
}

fn check_name(name: &str, complaint: &'static str) -> ChatResult<()> {
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN || name.chars().any(char::is_control) {
        return Err(ChatError::InvalidInput(complaint));
    }
    Ok(())
}

/// Group names end up inside attribute selectors of pushed updates.
fn check_group_name(name: &str) -> ChatResult<()> {
    check_name(name, "group name must be 1 to 64 characters")?;
    if name.chars().any(|c| matches!(c, '\'' | '"' | '\\' | '<' | '>' | '[' | ']' | '{' | '}')) {
        return Err(ChatError::InvalidInput("group name contains a reserved character"));
    }
    Ok(())
}

fn check_content(content: &str) -> ChatResult<()> {
    if content.trim().is_empty() {
        return Err(ChatError::InvalidInput("message is empty"));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(ChatError::InvalidInput("message is too long"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles() {
        assert!(check_handle("alice_01").is_ok());
        assert!(check_handle("").is_err());
        assert!(check_handle("al ice").is_err());
        assert!(check_handle(&"a".repeat(33)).is_err());
    }

    #[test]
    fn group_names() {
        assert!(check_group_name("rust fans").is_ok());
        assert!(check_group_name("").is_err());
        assert!(check_group_name("o'clock").is_err());
    }

    #[test]
    fn contents() {
        assert!(check_content("hi").is_ok());
        assert!(check_content("  \n ").is_err());
    }
}
