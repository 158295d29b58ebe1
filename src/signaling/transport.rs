use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;

use super::types::{ConnectionId, OutboundMessage, StreamId};

/// Per-connection outbound channels and named groups.
///
/// This is the only place that knows how to reach a connection. The
/// coordinator talks to clients exclusively through `emit_to` and
/// `emit_to_group`.
#[derive(Debug, Default)]
pub struct Transport {
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<OutboundMessage>>,
    groups: HashMap<StreamId, HashSet<ConnectionId>>,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ConnectionId, tx: mpsc::UnboundedSender<OutboundMessage>) {
        self.connections.insert(id, tx);
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Drops the connection's channel and removes it from every group.
    pub fn unregister(&mut self, id: &ConnectionId) {
        self.connections.remove(id);
        self.groups.retain(|_, members| {
            members.remove(id);
            !members.is_empty()
        });
    }

    pub fn join(&mut self, group: &StreamId, id: ConnectionId) {
        self.groups.entry(group.clone()).or_default().insert(id);
    }

    pub fn leave(&mut self, group: &StreamId, id: &ConnectionId) {
        if let Some(members) = self.groups.get_mut(group) {
            members.remove(id);
            if members.is_empty() {
                self.groups.remove(group);
            }
        }
    }

    pub fn members(&self, group: &StreamId) -> Vec<ConnectionId> {
        self.groups
            .get(group)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, group: &StreamId, id: &ConnectionId) -> bool {
        self.groups
            .get(group)
            .is_some_and(|members| members.contains(id))
    }

    /// Returns false if the connection is gone or its writer has shut down.
    pub fn emit_to(&self, id: &ConnectionId, msg: &OutboundMessage) -> bool {
        match self.connections.get(id) {
            Some(tx) => tx.send(msg.clone()).is_ok(),
            None => false,
        }
    }

    /// Returns the number of connections the message was handed to.
    pub fn emit_to_group(&self, group: &StreamId, msg: &OutboundMessage) -> usize {
        self.members(group)
            .iter()
            .filter(|id| self.emit_to(id, msg))
            .count()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
