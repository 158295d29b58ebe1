use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{ConnectionId, OutboundMessage, StreamId};

/// Messages sent from client to server
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Announce a broadcast under `streamId`
    #[serde(rename = "start-streaming")]
    StartStreaming {
        #[serde(rename = "streamId")]
        stream_id: StreamId,
        #[serde(default)]
        username: String,
    },

    /// Join an active broadcast as a listener
    #[serde(rename = "join-stream")]
    JoinStream {
        #[serde(rename = "streamId")]
        stream_id: StreamId,
        #[serde(default)]
        username: String,
    },

    /// Opaque peer-connection handshake data for one connection
    #[serde(rename = "signal")]
    Signal {
        to: ConnectionId,
        #[serde(default)]
        signal: Value,
    },
}

/// Messages sent from server to client
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Sent once after the handshake
    #[serde(rename = "connected")]
    Connected { id: ConnectionId },

    #[serde(rename = "user-joined-stream")]
    UserJoinedStream { username: String, message: String },

    /// Owner only: start a peer connection with this listener
    #[serde(rename = "listener-joined")]
    ListenerJoined {
        #[serde(rename = "listenerId")]
        listener_id: ConnectionId,
        #[serde(rename = "streamId")]
        stream_id: StreamId,
        username: String,
    },

    #[serde(rename = "signal")]
    Signal { from: ConnectionId, signal: Value },

    #[serde(rename = "stream-ended")]
    StreamEnded { message: String },

    #[serde(rename = "user-left-stream")]
    UserLeftStream { username: String, message: String },

    /// Error response
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerMessage {
    pub fn user_joined(username: &str) -> Self {
        ServerMessage::UserJoinedStream {
            username: username.to_string(),
            message: format!("{} joined the stream", username),
        }
    }

    pub fn user_left(username: &str) -> Self {
        ServerMessage::UserLeftStream {
            username: username.to_string(),
            message: format!("{} left the stream", username),
        }
    }

    pub fn stream_ended() -> Self {
        ServerMessage::StreamEnded {
            message: "Stream ended by host".to_string(),
        }
    }

    pub fn encode(&self) -> OutboundMessage {
        let json =
            serde_json::to_string(self).expect("ServerMessage serialization should never fail");
        OutboundMessage::from(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_start_streaming() {
        let json = r#"{"type": "start-streaming", "streamId": "s1", "username": "alice"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        if let ClientMessage::StartStreaming {
            stream_id,
            username,
        } = msg
        {
            assert_eq!(stream_id.as_str(), "s1");
            assert_eq!(username, "alice");
        } else {
            panic!("Expected StartStreaming");
        }
    }

    #[test]
    fn parse_join_stream_without_username() {
        let json = r#"{"type": "join-stream", "streamId": "s1"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        if let ClientMessage::JoinStream {
            stream_id,
            username,
        } = msg
        {
            assert_eq!(stream_id.as_str(), "s1");
            assert!(username.is_empty());
        } else {
            panic!("Expected JoinStream");
        }
    }

    #[test]
    fn parse_signal_keeps_payload_untouched() {
        let json = r#"{"type": "signal", "to": "conn_0000000000000001", "signal": {"sdp": "v=0", "nested": [1, 2]}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        if let ClientMessage::Signal { to, signal } = msg {
            assert_eq!(to.as_str(), "conn_0000000000000001");
            assert_eq!(signal, json!({"sdp": "v=0", "nested": [1, 2]}));
        } else {
            panic!("Expected Signal");
        }
    }

    #[test]
    fn parse_unknown_type_fails() {
        let json = r#"{"type": "leave-stream"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn serialize_listener_joined() {
        let msg = ServerMessage::ListenerJoined {
            listener_id: ConnectionId::from("conn_b"),
            stream_id: StreamId::from("s1"),
            username: "bob".to_string(),
        };
        let value: Value = serde_json::from_str(msg.encode().as_str()).unwrap();
        assert_eq!(
            value,
            json!({"type": "listener-joined", "listenerId": "conn_b", "streamId": "s1", "username": "bob"})
        );
    }

    #[test]
    fn serialize_user_joined() {
        let value: Value =
            serde_json::from_str(ServerMessage::user_joined("bob").encode().as_str()).unwrap();
        assert_eq!(
            value,
            json!({"type": "user-joined-stream", "username": "bob", "message": "bob joined the stream"})
        );
    }

    #[test]
    fn serialize_user_left() {
        let value: Value =
            serde_json::from_str(ServerMessage::user_left("bob").encode().as_str()).unwrap();
        assert_eq!(value["type"], "user-left-stream");
        assert_eq!(value["message"], "bob left the stream");
    }

    #[test]
    fn serialize_stream_ended() {
        let value: Value =
            serde_json::from_str(ServerMessage::stream_ended().encode().as_str()).unwrap();
        assert_eq!(
            value,
            json!({"type": "stream-ended", "message": "Stream ended by host"})
        );
    }

    #[test]
    fn serialize_error() {
        let msg = ServerMessage::Error {
            message: "Invalid message".to_string(),
        };
        let json = msg.encode();
        assert!(json.as_str().contains("\"type\":\"error\""));
        assert!(json.as_str().contains("Invalid message"));
    }
}
