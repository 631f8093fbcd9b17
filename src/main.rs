use std::sync::Arc;

use murmur::{app, chat::ChatService, config::Config, live::ConnectionRegistry, store::SqliteStore, AppState};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("murmur=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(config.session_inactivity));

    let store = SqliteStore::connect(&config.database_url, config.max_db_connections).await?;
    let registry = Arc::new(ConnectionRegistry::new());
    let chat = ChatService::new(Arc::new(store), registry);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");

    let app = app(AppState::new(chat, config), session_layer);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown())
        .await?;

    Ok(())
}

async fn shutdown() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for ctrl-c");
    }
    info!("shutting down");
}
