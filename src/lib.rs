pub mod auth;
pub mod chat;
pub mod config;
pub mod conversations;
pub mod error;
pub mod live;
pub mod models;
pub mod res;
pub mod session;
pub mod store;
pub mod views;

use std::sync::Arc;

use axum::{extract::FromRef, http::StatusCode, response::{IntoResponse, Response}, Router};
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::{chat::ChatService, config::Config, error::ChatError, live::Registry};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub chat: ChatService,
    pub registry: Arc<dyn Registry>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(chat: ChatService, config: Config) -> Self {
        Self {
            registry: chat.registry().clone(),
            chat,
            config: Arc::new(config),
        }
    }
}

pub fn app(state: AppState, sessions: SessionManagerLayer<MemoryStore>) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(conversations::router())
        .with_state(state)
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
}

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = self.0.downcast_ref::<ChatError>() {
            let status = err.status();
            if status == StatusCode::UNAUTHORIZED {
                return (status, res::sorry("page")).into_response();
            }
            if !status.is_server_error() {
                return (status, views::validation(false, &err.to_string())).into_response();
            }
        }

        tracing::error!(error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}\n\n{}", self.0, self.0.backtrace()),
        )
            .into_response()
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self(anyhow::Error::msg(err.to_owned()))
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(ChatError);
apperr_impl!(sqlx::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(axum::Error);
