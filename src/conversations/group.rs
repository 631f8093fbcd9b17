use axum::{debug_handler, extract::{Query, State}, response::Html, Form, Json};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    chat::ChatService,
    models::{ConversationId, Membership},
    session::current_user,
    views, AppResult, AppState,
};

use super::{reply_html, SendForm, Target};

#[derive(Deserialize)]
pub(crate) struct CreateForm {
    #[serde(rename = "group-name-input")]
    name: String,
    #[serde(default)]
    members: String,
}

#[derive(Deserialize)]
pub(crate) struct MemberForm {
    target: String,
    username: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn open(
    State(chat): State<ChatService>,
    session: Session,
    Query(Target { target }): Query<Target>,
) -> AppResult<Html<String>> {
    let handle = current_user(&session).await?;
    let thread = chat.open_thread(&handle, &ConversationId::Group(target)).await?;
    Ok(Html(views::thread(&thread, false)))
}

#[debug_handler(state = AppState)]
pub(crate) async fn create(
    State(chat): State<ChatService>,
    session: Session,
    Form(CreateForm { name, members }): Form<CreateForm>,
) -> AppResult<Html<String>> {
    let handle = current_user(&session).await?;
    let members: Vec<String> = members
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|member| !member.is_empty())
        .map(|member| member.trim_start_matches('@').to_owned())
        .collect();

    let created = chat.create_group_chat(&handle, &name, &members).await?;
    Ok(Html(views::thread(&created.thread, false) + &views::chat_item_to_top(&created.summary)))
}

#[debug_handler(state = AppState)]
pub(crate) async fn send(
    State(chat): State<ChatService>,
    session: Session,
    Form(SendForm { target, content }): Form<SendForm>,
) -> AppResult<Html<String>> {
    let handle = current_user(&session).await?;
    let reply = chat.send_group_message(&handle, &target, &content).await?;
    Ok(Html(reply_html(&reply)))
}

#[debug_handler(state = AppState)]
pub(crate) async fn add_member(
    State(chat): State<ChatService>,
    session: Session,
    Form(MemberForm { target, username }): Form<MemberForm>,
) -> AppResult<Json<Vec<Membership>>> {
    let handle = current_user(&session).await?;
    Ok(Json(chat.add_group_member(&handle, &target, &username).await?))
}

/// htmx sends `DELETE` parameters in the query string.
#[debug_handler(state = AppState)]
pub(crate) async fn remove_member(
    State(chat): State<ChatService>,
    session: Session,
    Query(MemberForm { target, username }): Query<MemberForm>,
) -> AppResult<Json<Vec<Membership>>> {
    let handle = current_user(&session).await?;
    Ok(Json(chat.remove_group_member(&handle, &target, &username).await?))
}
