use axum::{debug_handler, extract::State, response::Html, Form};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{chat::ChatService, error::ChatError, session::USER_HANDLE, views, AppResult, AppState};

#[derive(Deserialize)]
pub(crate) struct RegisterForm {
    username: String,
    #[serde(rename = "display-name")]
    display_name: String,
}

/// Main view when a session is live, registration form otherwise.
#[debug_handler(state = AppState)]
pub(crate) async fn index(State(chat): State<ChatService>, session: Session) -> AppResult<Html<String>> {
    if let Some(handle) = session.get::<String>(USER_HANDLE).await? {
        match chat.chat_list(&handle).await {
            Ok((user, chats)) => return Ok(Html(views::page(&views::main_view(&user, &chats)))),
            // account is gone
            Err(ChatError::UnknownUser(_)) => session.clear().await,
            Err(err) => return Err(err.into()),
        }
    }

    Ok(Html(views::page(views::register_form())))
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(chat): State<ChatService>,
    session: Session,
    Form(RegisterForm { username, display_name }): Form<RegisterForm>,
) -> AppResult<Html<String>> {
    let user = chat.register_user(&username, &display_name).await?;
    session.cycle_id().await?;
    session.insert(USER_HANDLE, &user.handle).await?;

    let (user, chats) = chat.chat_list(&user.handle).await?;
    Ok(Html(views::main_view(&user, &chats)))
}
