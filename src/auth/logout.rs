use axum::{debug_handler, response::Html};
use tower_sessions::Session;

use crate::{views, AppResult};

#[debug_handler]
pub(crate) async fn logout(session: Session) -> AppResult<Html<&'static str>> {
    session.flush().await?;
    Ok(Html(views::login_form()))
}
