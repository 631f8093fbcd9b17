use axum::{routing::{get, post, put}, Router};

use crate::AppState;

mod account;
mod login;
mod logout;
mod register;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(register::index))
        .route("/user", post(register::register).patch(account::rename).delete(account::delete))
        .route("/users", get(account::users))
        .route("/login", get(login::login_page).post(login::login))
        .route("/user-exists", post(login::user_exists))
        .route("/logout", put(logout::logout))
}
