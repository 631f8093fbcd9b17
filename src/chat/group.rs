use std::collections::BTreeSet;

use time::OffsetDateTime;
use tracing::info;

use crate::{
    error::{ChatError, ChatResult},
    models::{ConversationId, GroupChat, Membership},
    views::{self, Bubble, ChatSummary, ThreadView},
};

use super::{ChatService, Reply, check_content, check_group_name};

#[derive(Debug, Clone)]
pub struct CreatedGroup {
    pub group: GroupChat,
    pub members: Vec<Membership>,
    pub thread: ThreadView,
    pub summary: ChatSummary,
}

impl ChatService {
    /// The creator is always a member and the only admin; other handles are
    /// de-duplicated and must all exist.
    pub async fn create_group_chat(&self, creator: &str, name: &str, members: &[String]) -> ChatResult<CreatedGroup> {
        let name = name.trim();
        check_group_name(name)?;
        let creator = self.user(creator).await?;
        if self.store.find_group(name).await?.is_some() {
            return Err(ChatError::DuplicateGroup(name.to_owned()));
        }

        let handles: BTreeSet<&str> = members
            .iter()
            .map(|handle| handle.trim())
            .filter(|handle| !handle.is_empty() && *handle != creator.handle)
            .collect();

        let mut memberships = vec![Membership {
            user: creator.clone(),
            is_admin: true,
        }];
        for handle in handles {
            memberships.push(Membership {
                user: self.user(handle).await?,
                is_admin: false,
            });
        }

        let group = self.store.create_group(name, &memberships).await?;
        info!(group = %group.name, creator = %creator.handle, members = memberships.len(), "group created");

        let conversation = ConversationId::Group(group.name.clone());
        self.fanout.notify(
            memberships.iter().map(|m| &m.user).filter(|user| **user != creator),
            |user| views::chat_item_to_top(&ChatSummary::new(&user.handle, conversation.clone(), &group.name, None)),
        );

        Ok(CreatedGroup {
            thread: ThreadView::new(&creator.handle, conversation.clone(), &group.name, &[]),
            summary: ChatSummary::new(&creator.handle, conversation, &group.name, None),
            members: memberships,
            group,
        })
    }

    pub async fn send_group_message(&self, sender: &str, group: &str, content: &str) -> ChatResult<Reply> {
        check_content(content)?;
        let sender = self.user(sender).await?;
        let group = self.group(group).await?;
        self.require_member(&group, &sender.handle).await?;

        let sent = self
            .store
            .create_message_group(content, &sender, &group, OffsetDateTime::now_utc())
            .await?;
        info!(from = %sender.handle, group = %group.name, id = sent.message.id, "group message");

        let conversation = ConversationId::Group(group.name.clone());
        let history = self.store.thread_history(&sender.handle, &conversation).await?;
        let thread = ThreadView::new(&sender.handle, conversation.clone(), &group.name, &history);
        let summary = ChatSummary::new(&sender.handle, conversation.clone(), &group.name, Some(&sent.message));

        // whoever belongs to the group now, not when it was created
        let members = self.store.group_members(&group).await?;
        self.fanout.notify(
            members.iter().map(|m| &m.user).filter(|user| **user != sender),
            |user| {
                let theirs = sent.conversation_for(&user.handle);
                let row = ChatSummary::new(&user.handle, theirs.clone(), &group.name, Some(&sent.message));
                views::chat_item_to_top(&row) + &views::bubble_appended(&theirs, &Bubble::of(&user.handle, &sent.message))
            },
        );

        Ok(Reply { thread, summary })
    }

    pub async fn add_group_member(&self, actor: &str, group: &str, handle: &str) -> ChatResult<Vec<Membership>> {
        let group = self.group(group).await?;
        self.require_admin(&group, actor).await?;
        let user = self.user(handle.trim()).await?;

        let added = self
            .store
            .add_group_member(&group, &Membership { user: user.clone(), is_admin: false })
            .await?;
        if added {
            info!(group = %group.name, handle = %user.handle, by = actor, "member added");

            let conversation = ConversationId::Group(group.name.clone());
            let history = self.store.thread_history(&user.handle, &conversation).await?;
            let latest = history.last().map(|m| &m.message);
            self.fanout.notify([&user], |user| {
                views::chat_item_to_top(&ChatSummary::new(&user.handle, conversation.clone(), &group.name, latest))
            });
        }

        self.store.group_members(&group).await
    }

    /// Admins may remove anyone; everyone may remove themselves.
    pub async fn remove_group_member(&self, actor: &str, group: &str, handle: &str) -> ChatResult<Vec<Membership>> {
        let group = self.group(group).await?;
        let handle = handle.trim();
        if actor != handle {
            self.require_admin(&group, actor).await?;
        }

        if self.store.remove_group_member(&group, handle).await? {
            info!(group = %group.name, handle, by = actor, "member removed");

            let user = self.user(handle).await?;
            let conversation = ConversationId::Group(group.name.clone());
            self.fanout.notify([&user], |_| views::chat_item_removed(&conversation));
        }

        self.store.group_members(&group).await
    }

    pub(super) async fn require_member(&self, group: &GroupChat, handle: &str) -> ChatResult<Membership> {
        self.store
            .group_members(group)
            .await?
            .into_iter()
            .find(|m| m.user.handle == handle)
            .ok_or_else(|| ChatError::NotGroupMember {
                handle: handle.to_owned(),
                group: group.name.clone(),
            })
    }

    async fn require_admin(&self, group: &GroupChat, handle: &str) -> ChatResult<()> {
        let membership = self.require_member(group, handle).await;
        match membership {
            Ok(Membership { is_admin: true, .. }) => Ok(()),
            Ok(_) | Err(ChatError::NotGroupMember { .. }) => Err(ChatError::NotGroupAdmin {
                handle: handle.to_owned(),
                group: group.name.clone(),
            }),
            Err(err) => Err(err),
        }
    }
}
