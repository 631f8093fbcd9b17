use axum::{debug_handler, extract::State, response::{Html, IntoResponse}, Form};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{chat::ChatService, session::USER_HANDLE, views, AppResult, AppState};

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    username: String,
}

#[derive(Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Expect {
    Free,
    Taken,
}

#[derive(Deserialize)]
pub(crate) struct UserExistsForm {
    username: String,
    expect: Expect,
}

#[debug_handler]
pub(crate) async fn login_page() -> impl IntoResponse {
    Html(views::page(views::login_form()))
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(chat): State<ChatService>,
    session: Session,
    Form(LoginForm { username }): Form<LoginForm>,
) -> AppResult<Html<String>> {
    let user = chat.login(&username).await?;
    session.cycle_id().await?;
    session.insert(USER_HANDLE, &user.handle).await?;
    tracing::info!(handle = %user.handle, "logged in");

    let (user, chats) = chat.chat_list(&user.handle).await?;
    Ok(Html(views::main_view(&user, &chats)))
}

/// Live feedback for the username fields of both forms.
#[debug_handler(state = AppState)]
pub(crate) async fn user_exists(
    State(chat): State<ChatService>,
    Form(UserExistsForm { username, expect }): Form<UserExistsForm>,
) -> AppResult<Html<String>> {
    if username.trim().is_empty() {
        return Ok(Html(String::new()));
    }

    let exists = chat.user_exists(&username).await?;
    let html = match (expect, exists) {
        (Expect::Free, false) => views::validation(true, "username is available"),
        (Expect::Free, true) => views::validation(false, "username is taken"),
        (Expect::Taken, true) => views::validation(true, "user found"),
        (Expect::Taken, false) => views::validation(false, "no such user"),
    };
    Ok(Html(html))
}
