use tower_sessions::Session;

use crate::{AppResult, error::ChatError};

pub const USER_HANDLE: &str = "user_handle";

/// Handle of the logged-in user, or `NotLoggedIn`.
pub async fn current_user(session: &Session) -> AppResult<String> {
    match session.get::<String>(USER_HANDLE).await? {
        Some(handle) => Ok(handle),
        None => Err(ChatError::NotLoggedIn)?,
    }
}
