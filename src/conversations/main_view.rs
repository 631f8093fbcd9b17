use axum::{debug_handler, extract::State, response::Html};
use tower_sessions::Session;

use crate::{chat::ChatService, session::current_user, views, AppResult, AppState};

#[debug_handler(state = AppState)]
pub(crate) async fn main_view(State(chat): State<ChatService>, session: Session) -> AppResult<Html<String>> {
    let handle = current_user(&session).await?;
    let (user, chats) = chat.chat_list(&handle).await?;
    Ok(Html(views::main_view(&user, &chats)))
}
