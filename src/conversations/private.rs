use axum::{debug_handler, extract::{Query, State}, response::Html, Form};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{chat::ChatService, models::ConversationId, session::current_user, views, AppResult, AppState};

use super::{reply_html, SendForm, Target};

#[derive(Deserialize)]
pub(crate) struct StartForm {
    #[serde(rename = "username-input")]
    username: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn open(
    State(chat): State<ChatService>,
    session: Session,
    Query(Target { target }): Query<Target>,
) -> AppResult<Html<String>> {
    let handle = current_user(&session).await?;
    let thread = chat.open_thread(&handle, &ConversationId::Private(target)).await?;
    Ok(Html(views::thread(&thread, false)))
}

/// Opens the chat with a user, creating it on first contact.
#[debug_handler(state = AppState)]
pub(crate) async fn start(
    State(chat): State<ChatService>,
    session: Session,
    Form(StartForm { username }): Form<StartForm>,
) -> AppResult<Html<String>> {
    let handle = current_user(&session).await?;
    let reply = chat.open_private_chat(&handle, &username).await?;
    Ok(Html(reply_html(&reply)))
}

#[debug_handler(state = AppState)]
pub(crate) async fn send(
    State(chat): State<ChatService>,
    session: Session,
    Form(SendForm { target, content }): Form<SendForm>,
) -> AppResult<Html<String>> {
    let handle = current_user(&session).await?;
    let reply = chat.send_private_message(&handle, &target, &content).await?;
    Ok(Html(reply_html(&reply)))
}
