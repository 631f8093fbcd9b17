use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{ws::{Message, WebSocket}, State, WebSocketUpgrade},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tower_sessions::Session;
use tracing::debug;

use crate::{
    config::Config,
    live::{Connection, Registration, Registry},
    session::current_user,
    AppResult, AppState,
};

/// The per-user live channel. Inbound frames are ignored; everything the
/// fan-out pushes for this user is forwarded as a text frame.
#[debug_handler(state = AppState)]
pub(crate) async fn ws(
    State(registry): State<Arc<dyn Registry>>,
    State(config): State<Arc<Config>>,
    session: Session,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let handle = current_user(&session).await?;
    let buffer = config.connection_buffer;

    Ok(ws.on_upgrade(move |socket| serve(socket, registry, handle, buffer)))
}

async fn serve(socket: WebSocket, registry: Arc<dyn Registry>, handle: String, buffer: usize) {
    let (connection, mut rx) = Connection::open(buffer);
    let registration = Registration::new(registry, &handle, connection);
    debug!(%handle, id = %registration.id(), "live channel open");

    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            inbound = receiver.next() => match inbound {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            },
            outbound = rx.recv() => match outbound {
                Some(payload) => {
                    if sender.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    debug!(%handle, id = %registration.id(), "live channel closed");
}
