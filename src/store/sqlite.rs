use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    SqliteConnection, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::{
    error::{ChatError, ChatResult, is_unique_violation},
    models::{
        Addressee, ChatMessage, Conversation, ConversationId, GroupChat, Membership, Message, User,
        canonical_pair, from_micros, to_micros,
    },
};

use super::{ChatStore, schema};

type PrivateRow = (i64, String, i64, Option<i64>, String, String, String, String);
type GroupRow = (i64, String, i64, Option<i64>, String, String, i64, String);
type LatestRow = (
    String,
    String,
    Option<i64>,
    Option<String>,
    Option<i64>,
    Option<i64>,
    Option<String>,
    Option<String>,
);
type LatestGroupRow = (
    i64,
    String,
    Option<i64>,
    Option<String>,
    Option<i64>,
    Option<i64>,
    Option<String>,
    Option<String>,
);

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and makes sure the
    /// schema exists.
    pub async fn connect(url: &str, max_connections: u32) -> ChatResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        info!(url, "chat store ready");
        Ok(store)
    }

    /// A private database that lives as long as the store. A single pooled
    /// connection that never expires, since every connection to
    /// `sqlite::memory:` sees its own empty database.
    pub async fn in_memory() -> ChatResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> ChatResult<()> {
        for statement in schema::CREATE_TABLES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn message_from(
    id: i64,
    content: String,
    created: i64,
    modified: Option<i64>,
    sender: User,
) -> ChatResult<Message> {
    Ok(Message {
        id,
        content,
        sender,
        created: from_micros(created)?,
        modified: modified.map(from_micros).transpose()?,
    })
}

async fn private_chat_id(
    conn: &mut SqliteConnection,
    a: &str,
    b: &str,
) -> ChatResult<Option<i64>> {
    let (low, high) = canonical_pair(a, b);
    let id: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM private_chats WHERE user_low=? AND user_high=?")
            .bind(low)
            .bind(high)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(id.map(|(id,)| id))
}

/// Insert-if-absent on the canonical pair, then read the surviving row. The
/// unique constraint makes concurrent first contacts converge on one chat.
async fn find_or_create_private_chat_in(
    conn: &mut SqliteConnection,
    a: &str,
    b: &str,
) -> ChatResult<i64> {
    if a == b {
        return Err(ChatError::InvalidInput("cannot open a private chat with yourself"));
    }

    let (low, high) = canonical_pair(a, b);
    let inserted = sqlx::query(
        "INSERT INTO private_chats (user_low,user_high) VALUES (?,?) ON CONFLICT (user_low,user_high) DO NOTHING",
    )
    .bind(low)
    .bind(high)
    .execute(&mut *conn)
    .await?;
    if inserted.rows_affected() > 0 {
        debug!(low, high, "private chat created");
    }

    private_chat_id(conn, a, b)
        .await?
        .ok_or(ChatError::Storage(sqlx::Error::RowNotFound))
}

async fn insert_message(
    conn: &mut SqliteConnection,
    content: &str,
    sender: &str,
    created: OffsetDateTime,
) -> ChatResult<i64> {
    let result = sqlx::query("INSERT INTO messages (content,sender,created,modified) VALUES (?,?,?,NULL)")
        .bind(content)
        .bind(sender)
        .bind(to_micros(created))
        .execute(&mut *conn)
        .await?;
    Ok(result.last_insert_rowid())
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn find_user(&self, handle: &str) -> ChatResult<Option<User>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT handle,display_name FROM users WHERE handle=?")
                .bind(handle)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(handle, display_name)| User { handle, display_name }))
    }

    async fn list_users(&self) -> ChatResult<Vec<User>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT handle,display_name FROM users ORDER BY handle")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(handle, display_name)| User { handle, display_name })
            .collect())
    }

    async fn create_user(&self, user: &User) -> ChatResult<User> {
        sqlx::query("INSERT INTO users (handle,display_name) VALUES (?,?)")
            .bind(&user.handle)
            .bind(&user.display_name)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    ChatError::DuplicateUser(user.handle.clone())
                } else {
                    err.into()
                }
            })?;
        Ok(user.clone())
    }

    async fn update_display_name(&self, handle: &str, display_name: &str) -> ChatResult<User> {
        let result = sqlx::query("UPDATE users SET display_name=? WHERE handle=?")
            .bind(display_name)
            .bind(handle)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ChatError::UnknownUser(handle.to_owned()));
        }
        Ok(User::new(handle, display_name))
    }

    async fn delete_user(&self, handle: &str) -> ChatResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE handle=?")
            .bind(handle)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_or_create_private_chat(&self, a: &str, b: &str) -> ChatResult<i64> {
        let mut conn = self.pool.acquire().await?;
        find_or_create_private_chat_in(&mut *conn, a, b).await
    }

    async fn private_chat_exists(&self, a: &str, b: &str) -> ChatResult<bool> {
        let mut conn = self.pool.acquire().await?;
        Ok(private_chat_id(&mut *conn, a, b).await?.is_some())
    }

    async fn create_message_private(
        &self,
        content: &str,
        sender: &User,
        recipient: &User,
        created: OffsetDateTime,
    ) -> ChatResult<ChatMessage> {
        let mut tx = self.pool.begin().await?;

        let chat_id = find_or_create_private_chat_in(&mut *tx, &sender.handle, &recipient.handle).await?;
        let message_id = insert_message(&mut *tx, content, &sender.handle, created).await?;
        sqlx::query("INSERT INTO private_messages (message_id,chat_id,recipient) VALUES (?,?,?)")
            .bind(message_id)
            .bind(chat_id)
            .bind(&recipient.handle)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(ChatMessage {
            message: Message {
                id: message_id,
                content: content.to_owned(),
                sender: sender.clone(),
                created: from_micros(to_micros(created))?,
                modified: None,
            },
            addressee: Addressee::Private { recipient: recipient.clone() },
        })
    }

    async fn find_group(&self, name: &str) -> ChatResult<Option<GroupChat>> {
        let row: Option<(i64, String)> = sqlx::query_as("SELECT id,name FROM group_chats WHERE name=?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, name)| GroupChat { id, name }))
    }

    async fn create_group(&self, name: &str, members: &[Membership]) -> ChatResult<GroupChat> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO group_chats (name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    ChatError::DuplicateGroup(name.to_owned())
                } else {
                    err.into()
                }
            })?;
        let group = GroupChat {
            id: result.last_insert_rowid(),
            name: name.to_owned(),
        };

        for member in members {
            sqlx::query("INSERT INTO group_members (group_id,user,is_admin) VALUES (?,?,?)")
                .bind(group.id)
                .bind(&member.user.handle)
                .bind(member.is_admin)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(group)
    }

    async fn create_message_group(
        &self,
        content: &str,
        sender: &User,
        group: &GroupChat,
        created: OffsetDateTime,
    ) -> ChatResult<ChatMessage> {
        let mut tx = self.pool.begin().await?;

        let message_id = insert_message(&mut *tx, content, &sender.handle, created).await?;
        sqlx::query("INSERT INTO group_messages (message_id,group_id) VALUES (?,?)")
            .bind(message_id)
            .bind(group.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(ChatMessage {
            message: Message {
                id: message_id,
                content: content.to_owned(),
                sender: sender.clone(),
                created: from_micros(to_micros(created))?,
                modified: None,
            },
            addressee: Addressee::Group { group: group.clone() },
        })
    }

    async fn group_members(&self, group: &GroupChat) -> ChatResult<Vec<Membership>> {
        let rows: Vec<(String, String, bool)> = sqlx::query_as(
            "SELECT u.handle,u.display_name,m.is_admin FROM group_members m JOIN users u ON u.handle=m.user WHERE m.group_id=? ORDER BY u.handle",
        )
        .bind(group.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(handle, display_name, is_admin)| Membership {
                user: User { handle, display_name },
                is_admin,
            })
            .collect())
    }

    async fn add_group_member(&self, group: &GroupChat, member: &Membership) -> ChatResult<bool> {
        let result = sqlx::query(
            "INSERT INTO group_members (group_id,user,is_admin) VALUES (?,?,?) ON CONFLICT (group_id,user) DO NOTHING",
        )
        .bind(group.id)
        .bind(&member.user.handle)
        .bind(member.is_admin)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_group_member(&self, group: &GroupChat, handle: &str) -> ChatResult<bool> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id=? AND user=?")
            .bind(group.id)
            .bind(handle)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn latest_message_per_conversation(&self, handle: &str) -> ChatResult<Vec<Conversation>> {
        let private: Vec<LatestRow> = sqlx::query_as(
            r#"SELECT c.counterpart, u.display_name, m.id, m.content, m.created, m.modified, s.handle, s.display_name
            FROM (SELECT pc.id AS chat_id,
                         CASE WHEN pc.user_low = ?1 THEN pc.user_high ELSE pc.user_low END AS counterpart
                  FROM private_chats pc
                  WHERE ?1 IN (pc.user_low, pc.user_high)) c
            JOIN users u ON u.handle = c.counterpart
            LEFT JOIN (SELECT pm.chat_id, pm.message_id,
                              ROW_NUMBER() OVER (PARTITION BY pm.chat_id ORDER BY mm.created DESC, mm.id DESC) AS rn
                       FROM private_messages pm
                       JOIN messages mm ON mm.id = pm.message_id) latest
                   ON latest.chat_id = c.chat_id AND latest.rn = 1
            LEFT JOIN messages m ON m.id = latest.message_id
            LEFT JOIN users s ON s.handle = m.sender"#,
        )
        .bind(handle)
        .fetch_all(&self.pool)
        .await?;

        let groups: Vec<LatestGroupRow> = sqlx::query_as(
            r#"SELECT g.id, g.name, m.id, m.content, m.created, m.modified, s.handle, s.display_name
            FROM group_members gmb
            JOIN group_chats g ON g.id = gmb.group_id
            LEFT JOIN (SELECT gm.group_id, gm.message_id,
                              ROW_NUMBER() OVER (PARTITION BY gm.group_id ORDER BY mm.created DESC, mm.id DESC) AS rn
                       FROM group_messages gm
                       JOIN messages mm ON mm.id = gm.message_id) latest
                   ON latest.group_id = g.id AND latest.rn = 1
            LEFT JOIN messages m ON m.id = latest.message_id
            LEFT JOIN users s ON s.handle = m.sender
            WHERE gmb.user = ?1"#,
        )
        .bind(handle)
        .fetch_all(&self.pool)
        .await?;

        let mut conversations = Vec::with_capacity(private.len() + groups.len());

        for (counterpart, title, id, content, created, modified, sender, sender_name) in private {
            let latest = match (id, content, created, sender, sender_name) {
                (Some(id), Some(content), Some(created), Some(sender), Some(sender_name)) => Some(
                    message_from(id, content, created, modified, User::new(sender, sender_name))?,
                ),
                _ => None,
            };
            conversations.push(Conversation {
                id: ConversationId::Private(counterpart),
                title,
                latest,
            });
        }

        for (_, name, id, content, created, modified, sender, sender_name) in groups {
            let latest = match (id, content, created, sender, sender_name) {
                (Some(id), Some(content), Some(created), Some(sender), Some(sender_name)) => Some(
                    message_from(id, content, created, modified, User::new(sender, sender_name))?,
                ),
                _ => None,
            };
            conversations.push(Conversation {
                id: ConversationId::Group(name.clone()),
                title: name,
                latest,
            });
        }

        Ok(conversations)
    }

    async fn thread_history(
        &self,
        viewer: &str,
        conversation: &ConversationId,
    ) -> ChatResult<Vec<ChatMessage>> {
        match conversation {
            ConversationId::Private(counterpart) => {
                let (low, high) = canonical_pair(viewer, counterpart);
                let rows: Vec<PrivateRow> = sqlx::query_as(
                    r#"SELECT m.id, m.content, m.created, m.modified, s.handle, s.display_name, r.handle, r.display_name
                    FROM private_messages pm
                    JOIN private_chats pc ON pc.id = pm.chat_id
                    JOIN messages m ON m.id = pm.message_id
                    JOIN users s ON s.handle = m.sender
                    JOIN users r ON r.handle = pm.recipient
                    WHERE pc.user_low = ? AND pc.user_high = ?
                    ORDER BY m.created, m.id"#,
                )
                .bind(low)
                .bind(high)
                .fetch_all(&self.pool)
                .await?;

                rows.into_iter()
                    .map(|(id, content, created, modified, sender, sender_name, recipient, recipient_name)| -> ChatResult<ChatMessage> {
                        Ok(ChatMessage {
                            message: message_from(id, content, created, modified, User::new(sender, sender_name))?,
                            addressee: Addressee::Private {
                                recipient: User::new(recipient, recipient_name),
                            },
                        })
                    })
                    .collect()
            }
            ConversationId::Group(name) => {
                let rows: Vec<GroupRow> = sqlx::query_as(
                    r#"SELECT m.id, m.content, m.created, m.modified, s.handle, s.display_name, g.id, g.name
                    FROM group_messages gm
                    JOIN group_chats g ON g.id = gm.group_id
                    JOIN messages m ON m.id = gm.message_id
                    JOIN users s ON s.handle = m.sender
                    WHERE g.name = ?
                    ORDER BY m.created, m.id"#,
                )
                .bind(name)
                .fetch_all(&self.pool)
                .await?;

                rows.into_iter()
                    .map(|(id, content, created, modified, sender, sender_name, group_id, group_name)| -> ChatResult<ChatMessage> {
                        Ok(ChatMessage {
                            message: message_from(id, content, created, modified, User::new(sender, sender_name))?,
                            addressee: Addressee::Group {
                                group: GroupChat { id: group_id, name: group_name },
                            },
                        })
                    })
                    .collect()
            }
        }
    }
}
