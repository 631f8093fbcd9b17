use axum::{debug_handler, extract::State, response::Html, Form, Json};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{chat::ChatService, models::User, session::current_user, views, AppResult, AppState};

#[derive(Deserialize)]
pub(crate) struct RenameForm {
    #[serde(rename = "display-name")]
    display_name: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn rename(
    State(chat): State<ChatService>,
    session: Session,
    Form(RenameForm { display_name }): Form<RenameForm>,
) -> AppResult<Html<String>> {
    let handle = current_user(&session).await?;
    chat.update_display_name(&handle, &display_name).await?;

    let (user, chats) = chat.chat_list(&handle).await?;
    Ok(Html(views::main_view(&user, &chats)))
}

/// Removes the account together with its chats and messages.
#[debug_handler(state = AppState)]
pub(crate) async fn delete(State(chat): State<ChatService>, session: Session) -> AppResult<Html<&'static str>> {
    let handle = current_user(&session).await?;
    chat.delete_user(&handle).await?;
    session.flush().await?;
    Ok(Html(views::register_form()))
}

#[debug_handler(state = AppState)]
pub(crate) async fn users(State(chat): State<ChatService>, session: Session) -> AppResult<Json<Vec<User>>> {
    current_user(&session).await?;
    Ok(Json(chat.list_users().await?))
}
