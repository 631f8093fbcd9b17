mod fanout;
mod registry;

pub use fanout::FanOut;
pub use registry::{
    Connection, ConnectionId, ConnectionRegistry, DeliveryError, Registration, Registry,
};
