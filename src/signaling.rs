//! WebSocket signaling server for live-audio streams

mod actor;
mod coordinator;
mod messages;
mod server;
mod transport;
mod types;

pub use actor::CoordinatorHandle;
pub use coordinator::Coordinator;
pub use messages::{ClientMessage, ServerMessage};
pub use server::SignalingServer;
pub use transport::Transport;
pub use types::{
    ConnectionId, ListenerMembership, OutboundMessage, SignalingError, StreamId, StreamSession,
};
