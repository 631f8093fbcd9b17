use crate::{error::ChatResult, models::User, views::ChatSummary};

use super::ChatService;

impl ChatService {
    /// One row per conversation, most recently active first. Conversations
    /// without messages go last, alphabetically.
    pub async fn chat_list(&self, viewer: &str) -> ChatResult<(User, Vec<ChatSummary>)> {
        let user = self.user(viewer).await?;

        let mut chats: Vec<ChatSummary> = self
            .store
            .latest_message_per_conversation(&user.handle)
            .await?
            .into_iter()
            .map(|conversation| ChatSummary::from_conversation(&user.handle, conversation))
            .collect();
        chats.sort_by(|a, b| b.time.cmp(&a.time).then_with(|| a.title.cmp(&b.title)));

        Ok((user, chats))
    }
}
