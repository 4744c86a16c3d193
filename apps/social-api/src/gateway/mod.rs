pub mod connection;
pub mod events;
pub mod handler;
pub mod registry;
pub mod server;
pub mod session;

pub use connection::{CloseReason, ConnectionHandle, DeliveryFailure, OutboundEvent};
pub use registry::SessionRegistry;
