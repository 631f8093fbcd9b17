use axum::http::StatusCode;
use thiserror::Error;

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("user @{0} does not exist")]
    UnknownUser(String),

    #[error("group {0} does not exist")]
    UnknownGroup(String),

    #[error("no conversation {0}")]
    UnknownConversation(String),

    #[error("group {0} already exists")]
    DuplicateGroup(String),

    #[error("user @{0} already exists")]
    DuplicateUser(String),

    #[error("@{handle} is not a member of {group}")]
    NotGroupMember { handle: String, group: String },

    #[error("@{handle} is not an admin of {group}")]
    NotGroupAdmin { handle: String, group: String },

    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("stored timestamp {0} is out of range")]
    CorruptTimestamp(i64),

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

impl ChatError {
    pub fn status(&self) -> StatusCode {
        use ChatError::*;
        match self {
            UnknownUser(_) | UnknownGroup(_) | UnknownConversation(_) => StatusCode::NOT_FOUND,
            DuplicateGroup(_) | DuplicateUser(_) => StatusCode::CONFLICT,
            NotGroupMember { .. } | NotGroupAdmin { .. } => StatusCode::FORBIDDEN,
            InvalidInput(_) => StatusCode::BAD_REQUEST,
            NotLoggedIn => StatusCode::UNAUTHORIZED,
            CorruptTimestamp(_) | Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// True when `err` is SQLite rejecting a row for a `UNIQUE` constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}
