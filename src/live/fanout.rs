use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::User;

use super::registry::{DeliveryError, Registry};

/// Pushes rendered updates to every open connection of a set of users.
#[derive(Clone)]
pub struct FanOut {
    registry: Arc<dyn Registry>,
}

impl FanOut {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    /// Renders at most once per recipient, and only for recipients with at
    /// least one open connection; every connection of that recipient gets
    /// the same payload. A failed push never stops the remaining ones: a
    /// closed connection is unregistered, a full one just misses this
    /// payload.
    pub fn notify<'a, I, F>(&self, recipients: I, mut render: F)
    where
        I: IntoIterator<Item = &'a User>,
        F: FnMut(&User) -> String,
    {
        for recipient in recipients {
            let connections = self.registry.connections_for(&recipient.handle);
            if connections.is_empty() {
                continue;
            }

            let payload = render(recipient);
            for connection in connections {
                match connection.push(payload.clone()) {
                    Ok(()) => {
                        debug!(handle = %recipient.handle, conn_id = %connection.id(), "pushed update");
                    }
                    Err(DeliveryError::Closed) => {
                        warn!(handle = %recipient.handle, conn_id = %connection.id(), "dropping stale live connection");
                        self.registry.unregister(&recipient.handle, connection.id());
                    }
                    Err(err @ DeliveryError::Full) => {
                        warn!(handle = %recipient.handle, conn_id = %connection.id(), %err, "update dropped");
                    }
                }
            }
        }
    }
}
