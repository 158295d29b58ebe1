use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messages::{ClientMessage, ServerMessage};
use super::transport::Transport;
use super::types::{
    ConnectionId, ListenerMembership, OutboundMessage, SignalingError, StreamId, StreamSession,
};

/// Stream ownership and listener membership for every live connection.
///
/// Every method runs to completion before the next one starts; the actor in
/// `actor.rs` is the only owner, so the tables need no locking.
#[derive(Debug, Default)]
pub struct Coordinator {
    transport: Transport,
    streams: HashMap<StreamId, StreamSession>,
    listeners: HashMap<ConnectionId, ListenerMembership>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and greet it with its id.
    pub fn connect(&mut self, tx: mpsc::UnboundedSender<OutboundMessage>) -> ConnectionId {
        let mut id = ConnectionId::generate();
        while self.transport.contains(&id) {
            id = ConnectionId::generate();
        }

        self.transport.register(id, tx);
        self.transport
            .emit_to(&id, &ServerMessage::Connected { id }.encode());

        info!("Connection {} registered", id);
        id
    }

    /// Run the handler for one inbound message. Errors never reach other connections.
    pub fn dispatch(&mut self, from: ConnectionId, msg: ClientMessage) {
        let result = match msg {
            ClientMessage::StartStreaming {
                stream_id,
                username,
            } => self.start_stream(from, stream_id, username),
            ClientMessage::JoinStream {
                stream_id,
                username,
            } => self.join_stream(from, stream_id, username),
            ClientMessage::Signal { to, signal } => self.relay_signal(from, to, signal),
        };

        match result {
            Ok(()) => {}
            Err(e @ SignalingError::InvalidInput(_)) => self.reject(&from, e.to_string()),
            Err(e) => warn!("Ignored message from {}: {}", from, e),
        }
    }

    /// Send an `error` reply to one connection only.
    pub fn reject(&self, to: &ConnectionId, message: String) {
        warn!("Rejected message from {}: {}", to, message);
        self.transport
            .emit_to(to, &ServerMessage::Error { message }.encode());
    }

    pub fn start_stream(
        &mut self,
        from: ConnectionId,
        stream_id: StreamId,
        username: String,
    ) -> Result<(), SignalingError> {
        if stream_id.is_empty() {
            return Err(SignalingError::InvalidInput(
                "streamId must not be empty".to_string(),
            ));
        }

        self.transport.join(&stream_id, from);
        let session = StreamSession {
            owner: from,
            username,
        };
        if let Some(previous) = self.streams.insert(stream_id.clone(), session)
            && previous.owner != from
        {
            warn!(
                "Stream {} taken over by {} (was {})",
                stream_id, from, previous.owner
            );
            let still_listening = self
                .listeners
                .get(&previous.owner)
                .is_some_and(|m| m.stream_id == stream_id);
            if !still_listening {
                self.transport.leave(&stream_id, &previous.owner);
            }
        }

        info!("Streamer {} started stream {}", from, stream_id);
        Ok(())
    }

    pub fn join_stream(
        &mut self,
        from: ConnectionId,
        stream_id: StreamId,
        username: String,
    ) -> Result<(), SignalingError> {
        let Some(owner) = self.streams.get(&stream_id).map(|s| s.owner) else {
            return Err(SignalingError::SessionNotFound(stream_id));
        };

        if let Some(previous) = self.listeners.remove(&from) {
            if previous.stream_id != stream_id {
                self.transport.leave(&previous.stream_id, &from);
            }
        }

        self.transport.join(&stream_id, from);
        self.listeners.insert(
            from,
            ListenerMembership {
                stream_id: stream_id.clone(),
                username: username.clone(),
            },
        );

        self.transport
            .emit_to_group(&stream_id, &ServerMessage::user_joined(&username).encode());

        let directive = ServerMessage::ListenerJoined {
            listener_id: from,
            stream_id: stream_id.clone(),
            username,
        };
        self.transport.emit_to(&owner, &directive.encode());

        info!("Listener {} joined stream {}", from, stream_id);
        Ok(())
    }

    pub fn relay_signal(
        &mut self,
        from: ConnectionId,
        to: ConnectionId,
        signal: Value,
    ) -> Result<(), SignalingError> {
        let msg = ServerMessage::Signal { from, signal }.encode();
        if !self.transport.emit_to(&to, &msg) {
            return Err(SignalingError::TargetUnreachable(to));
        }

        debug!("Relayed signal {} -> {}", from, to);
        Ok(())
    }

    /// Tear down everything keyed by or referencing `id`. Safe to call twice.
    pub fn disconnect(&mut self, id: &ConnectionId) {
        self.transport.unregister(id);

        let owned: Vec<StreamId> = self
            .streams
            .iter()
            .filter(|(_, session)| session.owner == *id)
            .map(|(stream_id, _)| stream_id.clone())
            .collect();

        for stream_id in owned {
            let notified = self
                .transport
                .emit_to_group(&stream_id, &ServerMessage::stream_ended().encode());
            self.streams.remove(&stream_id);
            self.prune_listeners(&stream_id);
            info!(
                "Stream {} ended by host {} ({} listeners notified)",
                stream_id, id, notified
            );
        }

        if let Some(membership) = self.listeners.remove(id) {
            self.transport.emit_to_group(
                &membership.stream_id,
                &ServerMessage::user_left(&membership.username).encode(),
            );
            info!("Listener {} left stream {}", id, membership.stream_id);
        }

        debug!("Connection {} removed", id);
    }

    /// Drop memberships of a stream that no longer has an owner.
    fn prune_listeners(&mut self, stream_id: &StreamId) {
        let transport = &mut self.transport;
        self.listeners.retain(|listener, membership| {
            if membership.stream_id == *stream_id {
                transport.leave(stream_id, listener);
                false
            } else {
                true
            }
        });
    }

    pub fn stream_owner(&self, stream_id: &StreamId) -> Option<ConnectionId> {
        self.streams.get(stream_id).map(|s| s.owner)
    }

    pub fn stream(&self, stream_id: &StreamId) -> Option<&StreamSession> {
        self.streams.get(stream_id)
    }

    pub fn listener(&self, id: &ConnectionId) -> Option<&ListenerMembership> {
        self.listeners.get(id)
    }

    pub fn group_members(&self, stream_id: &StreamId) -> Vec<ConnectionId> {
        self.transport.members(stream_id)
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn connection_count(&self) -> usize {
        self.transport.connection_count()
    }
}
