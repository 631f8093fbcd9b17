use time::OffsetDateTime;
use tracing::info;

use crate::{
    error::{ChatError, ChatResult},
    models::ConversationId,
    views::{self, Bubble, ChatSummary, ThreadView},
};

use super::{ChatService, Reply, check_content};

impl ChatService {
    /// Finds or creates the private chat and opens it.
    pub async fn open_private_chat(&self, viewer: &str, counterpart: &str) -> ChatResult<Reply> {
        let viewer = self.user(viewer).await?;
        let counterpart = self.user(counterpart.trim()).await?;
        if viewer == counterpart {
            return Err(ChatError::InvalidInput("cannot open a private chat with yourself"));
        }

        self.store
            .find_or_create_private_chat(&viewer.handle, &counterpart.handle)
            .await?;

        let conversation = ConversationId::Private(counterpart.handle.clone());
        let history = self.store.thread_history(&viewer.handle, &conversation).await?;
        let latest = history.last().map(|m| &m.message);
        Ok(Reply {
            summary: ChatSummary::new(&viewer.handle, conversation.clone(), &counterpart.display_name, latest),
            thread: ThreadView::new(&viewer.handle, conversation, &counterpart.display_name, &history),
        })
    }

    pub async fn send_private_message(&self, sender: &str, recipient: &str, content: &str) -> ChatResult<Reply> {
        check_content(content)?;
        let sender = self.user(sender).await?;
        let recipient = self.user(recipient).await?;
        if sender == recipient {
            return Err(ChatError::InvalidInput("cannot message yourself"));
        }

        let sent = self
            .store
            .create_message_private(content, &sender, &recipient, OffsetDateTime::now_utc())
            .await?;
        info!(from = %sender.handle, to = %recipient.handle, id = sent.message.id, "private message");

        let conversation = ConversationId::Private(recipient.handle.clone());
        let history = self.store.thread_history(&sender.handle, &conversation).await?;
        let thread = ThreadView::new(&sender.handle, conversation.clone(), &recipient.display_name, &history);
        let summary = ChatSummary::new(&sender.handle, conversation, &recipient.display_name, Some(&sent.message));

        self.fanout.notify([&recipient], |user| {
            // keyed by the sender from the recipient's side
            let theirs = sent.conversation_for(&user.handle);
            let row = ChatSummary::new(&user.handle, theirs.clone(), &sender.display_name, Some(&sent.message));
            views::chat_item_to_top(&row) + &views::bubble_appended(&theirs, &Bubble::of(&user.handle, &sent.message))
        });

        Ok(Reply { thread, summary })
    }
}
