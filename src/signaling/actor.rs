use tokio::sync::{mpsc, oneshot};
use tracing::info;

use super::coordinator::Coordinator;
use super::messages::ClientMessage;
use super::types::{ConnectionId, OutboundMessage, SignalingError};

/// Commands sent to the coordinator actor
pub(crate) enum CoordinatorCommand {
    Connect {
        peer_tx: mpsc::UnboundedSender<OutboundMessage>,
        reply: oneshot::Sender<ConnectionId>,
    },
    Message {
        from: ConnectionId,
        msg: ClientMessage,
    },
    Reject {
        from: ConnectionId,
        message: String,
    },
    Disconnect {
        id: ConnectionId,
    },
}

/// Owns the coordinator; commands are applied one at a time, in arrival order.
pub(crate) async fn coordinator_actor(mut rx: mpsc::Receiver<CoordinatorCommand>) {
    let mut coordinator = Coordinator::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            CoordinatorCommand::Connect { peer_tx, reply } => {
                let id = coordinator.connect(peer_tx);
                if reply.send(id).is_err() {
                    // the connection task went away before hearing back
                    coordinator.disconnect(&id);
                }
            }

            CoordinatorCommand::Message { from, msg } => {
                coordinator.dispatch(from, msg);
            }

            CoordinatorCommand::Reject { from, message } => {
                coordinator.reject(&from, message);
            }

            CoordinatorCommand::Disconnect { id } => {
                coordinator.disconnect(&id);
            }
        }
    }

    info!("Coordinator actor stopped");
}

/// Handle to communicate with the coordinator actor
#[derive(Clone)]
pub struct CoordinatorHandle {
    pub(crate) tx: mpsc::Sender<CoordinatorCommand>,
}

impl CoordinatorHandle {
    /// Spawn a coordinator actor with a command queue of `buffer` entries
    pub fn spawn(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel::<CoordinatorCommand>(buffer.max(1));
        tokio::spawn(coordinator_actor(rx));
        Self { tx }
    }

    /// Register a connection; the coordinator greets it through `peer_tx`
    pub async fn connect(
        &self,
        peer_tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Result<ConnectionId, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CoordinatorCommand::Connect {
                peer_tx,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))?;
        reply_rx
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))
    }

    /// Hand an inbound message to the coordinator
    pub async fn dispatch(&self, from: ConnectionId, msg: ClientMessage) {
        let _ = self
            .tx
            .send(CoordinatorCommand::Message { from, msg })
            .await;
    }

    /// Queue an `error` reply behind the connection's earlier messages
    pub async fn reject(&self, from: ConnectionId, message: String) {
        let _ = self
            .tx
            .send(CoordinatorCommand::Reject { from, message })
            .await;
    }

    /// Report transport teardown
    pub async fn disconnect(&self, id: &ConnectionId) {
        let _ = self
            .tx
            .send(CoordinatorCommand::Disconnect { id: *id })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signaling::types::StreamId;
    use serde_json::{Value, json};

    async fn next(rx: &mut mpsc::UnboundedReceiver<OutboundMessage>) -> Value {
        let msg = rx.recv().await.expect("channel closed");
        serde_json::from_str(msg.as_str()).unwrap()
    }

    #[tokio::test]
    async fn connect_greets_with_id() {
        let handle = CoordinatorHandle::spawn(16);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let id = handle.connect(tx).await.unwrap();

        assert_eq!(next(&mut rx).await, json!({"type": "connected", "id": id.as_str()}));
    }

    #[tokio::test]
    async fn commands_apply_in_order() {
        let handle = CoordinatorHandle::spawn(16);
        let (alice_tx, mut alice_rx) = mpsc::unbounded_channel();
        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();

        let alice = handle.connect(alice_tx).await.unwrap();
        let bob = handle.connect(bob_tx).await.unwrap();
        next(&mut alice_rx).await;
        next(&mut bob_rx).await;

        handle
            .dispatch(
                alice,
                ClientMessage::StartStreaming {
                    stream_id: StreamId::from("s1"),
                    username: "alice".to_string(),
                },
            )
            .await;
        handle
            .dispatch(
                bob,
                ClientMessage::JoinStream {
                    stream_id: StreamId::from("s1"),
                    username: "bob".to_string(),
                },
            )
            .await;

        assert_eq!(next(&mut alice_rx).await["type"], "user-joined-stream");
        assert_eq!(next(&mut alice_rx).await["type"], "listener-joined");
        assert_eq!(next(&mut bob_rx).await["type"], "user-joined-stream");

        handle.disconnect(&alice).await;
        assert_eq!(
            next(&mut bob_rx).await,
            json!({"type": "stream-ended", "message": "Stream ended by host"})
        );
    }

    #[tokio::test]
    async fn reject_is_ordered_after_earlier_messages() {
        let handle = CoordinatorHandle::spawn(16);
        let (alice_tx, mut alice_rx) = mpsc::unbounded_channel();
        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();

        let alice = handle.connect(alice_tx).await.unwrap();
        let bob = handle.connect(bob_tx).await.unwrap();
        next(&mut alice_rx).await;
        next(&mut bob_rx).await;

        handle
            .dispatch(
                alice,
                ClientMessage::StartStreaming {
                    stream_id: StreamId::from("s1"),
                    username: "alice".to_string(),
                },
            )
            .await;
        handle
            .dispatch(
                bob,
                ClientMessage::JoinStream {
                    stream_id: StreamId::from("s1"),
                    username: "bob".to_string(),
                },
            )
            .await;
        handle.reject(bob, "Invalid message".to_string()).await;

        assert_eq!(next(&mut bob_rx).await["type"], "user-joined-stream");
        assert_eq!(
            next(&mut bob_rx).await,
            json!({"type": "error", "message": "Invalid message"})
        );
    }

    #[tokio::test]
    async fn disconnect_drops_outbound_channel() {
        let handle = CoordinatorHandle::spawn(16);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let id = handle.connect(tx).await.unwrap();
        next(&mut rx).await;
        handle.disconnect(&id).await;

        assert!(rx.recv().await.is_none());
    }
}
