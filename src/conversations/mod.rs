use axum::{routing::{get, post}, Router};
use serde::Deserialize;

use crate::{chat::Reply, views, AppState};

mod group;
mod main_view;
mod private;
mod ws;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/main", post(main_view::main_view))
        .route("/private-chat", get(private::open).post(private::start))
        .route("/private-message", post(private::send))
        .route("/group-chat", get(group::open).post(group::create))
        .route("/group-message", post(group::send))
        .route("/group-members", post(group::add_member).delete(group::remove_member))
        .route("/ws", get(ws::ws))
}

/// Names the conversation a chat-list row or an open thread points at.
#[derive(Deserialize)]
pub(crate) struct Target {
    target: String,
}

#[derive(Deserialize)]
pub(crate) struct SendForm {
    target: String,
    #[serde(rename = "message-content")]
    content: String,
}

/// Swaps the thread pane and moves its chat-list row to the top.
fn reply_html(reply: &Reply) -> String {
    views::thread(&reply.thread, false) + &views::chat_item_to_top(&reply.summary)
}
