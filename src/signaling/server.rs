use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tracing::{debug, error, info, warn};

use super::actor::CoordinatorHandle;
use super::messages::ClientMessage;
use super::types::{ConnectionId, OutboundMessage};
use crate::config::ServerConfig;

pub struct SignalingServer {
    handle: CoordinatorHandle,
    listener: TcpListener,
    config: Arc<ServerConfig>,
}

impl SignalingServer {
    /// Spawn the coordinator and bind the listening socket
    pub async fn bind(config: ServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.bind).await?;
        let handle = CoordinatorHandle::spawn(config.command_buffer);

        info!("Signaling server listening on {}", listener.local_addr()?);

        Ok(Self {
            handle,
            listener,
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let handle = self.handle.clone();
            let config = self.config.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, handle, config).await {
                    error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handle: CoordinatorHandle,
    config: Arc<ServerConfig>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let origin_config = config.clone();
    let check_origin = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let origin = req
            .headers()
            .get("origin")
            .and_then(|value| value.to_str().ok());
        if origin_config.origin_allowed(origin) {
            Ok(resp)
        } else {
            warn!("Rejected handshake from {} with origin {:?}", addr, origin);
            let mut reject = ErrorResponse::new(Some("origin not allowed".to_string()));
            *reject.status_mut() = StatusCode::FORBIDDEN;
            Err(reject)
        }
    };

    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, check_origin).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel::<Message>();

    let conn_id = handle.connect(tx).await?;
    info!("WebSocket connection {} from {}", conn_id, addr);

    let ping_every: Duration = config.ping_interval();
    let pong_within: Duration = config.pong_timeout();
    let mut ping_interval = tokio::time::interval(ping_every);
    let mut waiting_for_pong = false;
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    let ws_msg = Message::Text(msg.into_inner());
                    if ws_tx.send(ws_msg).await.is_err() {
                        break;
                    }
                }
                Some(ctrl_msg) = ctrl_rx.recv() => {
                    if ws_tx.send(ctrl_msg).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    loop {
        let pong_timeout = async {
            match pong_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ping_interval.tick() => {
                if waiting_for_pong {
                    warn!("No Pong received, disconnecting {}", conn_id);
                    break;
                }
                if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                waiting_for_pong = true;
                pong_deadline = Some(tokio::time::Instant::now() + pong_within);
                debug!("Ping sent to {}", conn_id);
            }

            _ = pong_timeout => {
                warn!("Pong timeout, disconnecting {}", conn_id);
                break;
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("WebSocket error on {}: {}", conn_id, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        handle_text_message(&text, &handle, conn_id).await;
                    }
                    Message::Pong(_) => {
                        waiting_for_pong = false;
                        pong_deadline = None;
                        debug!("Pong received from {}", conn_id);
                    }
                    Message::Close(_) => {
                        info!("Close received from {}", conn_id);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    handle.disconnect(&conn_id).await;

    send_task.abort();
    info!("WebSocket disconnected: {}", conn_id);

    Ok(())
}

async fn handle_text_message(text: &str, handle: &CoordinatorHandle, conn_id: ConnectionId) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => handle.dispatch(conn_id, msg).await,
        Err(e) => {
            handle
                .reject(conn_id, format!("Invalid message: {}", e))
                .await;
        }
    }
}
