pub(super) const CREATE_TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        handle TEXT PRIMARY KEY NOT NULL,
        display_name TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS private_chats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_low TEXT NOT NULL REFERENCES users(handle) ON DELETE CASCADE,
        user_high TEXT NOT NULL REFERENCES users(handle) ON DELETE CASCADE,
        UNIQUE (user_low, user_high),
        CHECK (user_low < user_high)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS group_chats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS group_members (
        group_id INTEGER NOT NULL REFERENCES group_chats(id) ON DELETE CASCADE,
        user TEXT NOT NULL REFERENCES users(handle) ON DELETE CASCADE,
        is_admin INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (group_id, user)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content TEXT NOT NULL,
        sender TEXT NOT NULL REFERENCES users(handle) ON DELETE CASCADE,
        created INTEGER NOT NULL,
        modified INTEGER
    )"#,
    r#"CREATE TABLE IF NOT EXISTS private_messages (
        message_id INTEGER PRIMARY KEY REFERENCES messages(id) ON DELETE CASCADE,
        chat_id INTEGER NOT NULL REFERENCES private_chats(id) ON DELETE CASCADE,
        recipient TEXT NOT NULL REFERENCES users(handle) ON DELETE CASCADE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS group_messages (
        message_id INTEGER PRIMARY KEY REFERENCES messages(id) ON DELETE CASCADE,
        group_id INTEGER NOT NULL REFERENCES group_chats(id) ON DELETE CASCADE
    )"#,
    "CREATE INDEX IF NOT EXISTS private_messages_chat ON private_messages (chat_id)",
    "CREATE INDEX IF NOT EXISTS group_messages_group ON group_messages (group_id)",
    "CREATE INDEX IF NOT EXISTS group_members_user ON group_members (user)",
];
