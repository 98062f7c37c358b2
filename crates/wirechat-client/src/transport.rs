//! WebSocket transport for the chat client.
//!
//! Provides [`ConnectedTransport`] which handles socket I/O for frame
//! transport. This is a thin layer that connects, completes the session
//! handshake, and then just sends/receives frames — lifecycle and routing
//! logic stay in the [`crate::ConnectionManager`].
//!
//! The returned handle bundles an outbound channel, an inbound channel, and
//! an abort handle; an internal task bridges the channels to the socket.
//! When the socket closes or errors, the task exits and the inbound channel
//! ends, which is how the owner observes transport loss.

use std::time::Duration;

use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
};
use wirechat_proto::{Command, Frame};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket could not be opened.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Session handshake was rejected or malformed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Session handshake did not complete in time.
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
}

/// Handle to an established push connection.
///
/// Frames are sent and received via the channels; an internal task handles
/// the socket I/O.
pub struct ConnectedTransport {
    /// Send frames to the server.
    pub to_server: mpsc::Sender<Frame>,
    /// Receive frames from the server. Ends when the socket is gone.
    pub from_server: mpsc::Receiver<Frame>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedTransport {
    /// Stop the connection task. The socket closes without a goodbye.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }

    /// Clone of the abort handle, for owners that tear down later.
    #[must_use]
    pub fn abort_handle(&self) -> tokio::task::AbortHandle {
        self.abort_handle.clone()
    }
}

/// Open the socket and complete the session handshake.
///
/// Sends a CONNECT frame and waits for CONNECTED under `handshake_timeout`.
/// Any other reply (an ERROR frame, an unexpected command, a close) fails
/// the handshake.
pub async fn connect(
    ws_url: &str,
    handshake_timeout: Duration,
) -> Result<ConnectedTransport, TransportError> {
    let (socket, _response) = connect_async(ws_url)
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;
    let (mut sink, mut stream) = socket.split();

    sink.send(WsMessage::Text(Frame::connect(host_of(ws_url)).encode()))
        .await
        .map_err(|e| TransportError::Handshake(e.to_string()))?;

    let connected = tokio::time::timeout(handshake_timeout, await_connected(&mut stream))
        .await
        .map_err(|_| TransportError::HandshakeTimeout(handshake_timeout))??;
    tracing::debug!(version = connected.header("version"), "session established");

    let (to_server_tx, to_server_rx) = mpsc::channel::<Frame>(32);
    let (from_server_tx, from_server_rx) = mpsc::channel::<Frame>(32);

    let handle = tokio::spawn(run_connection(sink, stream, to_server_rx, from_server_tx));

    Ok(ConnectedTransport {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Read frames until the server answers the CONNECT.
async fn await_connected(stream: &mut SplitStream<Socket>) -> Result<Frame, TransportError> {
    loop {
        let msg = stream
            .next()
            .await
            .ok_or_else(|| TransportError::Handshake("closed during handshake".to_string()))?
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        let Some(raw) = text_of(msg) else {
            return Err(TransportError::Handshake("closed during handshake".to_string()));
        };
        if raw.is_empty() || Frame::is_heartbeat(&raw) {
            continue;
        }

        let frame =
            Frame::decode(&raw).map_err(|e| TransportError::Handshake(e.to_string()))?;
        match frame.command {
            Command::Connected => return Ok(frame),
            Command::Error => return Err(TransportError::Handshake(describe_error(&frame))),
            other => {
                return Err(TransportError::Handshake(format!(
                    "unexpected {other} during handshake"
                )));
            },
        }
    }
}

/// Run the connection, bridging between channels and the socket.
async fn run_connection(
    mut sink: SplitSink<Socket, WsMessage>,
    mut stream: SplitStream<Socket>,
    mut to_server: mpsc::Receiver<Frame>,
    from_server: mpsc::Sender<Frame>,
) {
    loop {
        tokio::select! {
            outbound = to_server.recv() => {
                // None: every sender dropped, the owner is gone.
                let Some(frame) = outbound else { break };
                if let Err(e) = sink.send(WsMessage::Text(frame.encode())).await {
                    tracing::warn!("send failed: {e}");
                    break;
                }
            },
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(msg)) => {
                        if !forward_inbound(msg, &from_server).await {
                            break;
                        }
                    },
                    Some(Err(e)) => {
                        tracing::debug!("stream error: {e}");
                        break;
                    },
                    None => break,
                }
            },
        }
    }
    // Dropping from_server here ends the inbound channel; the owner observes
    // the closure and transitions to Disconnected.
}

/// Forward one socket message to the inbound channel.
///
/// Returns false when the connection task should stop. Malformed frames are
/// logged and dropped — they must not terminate the subscription.
async fn forward_inbound(msg: WsMessage, from_server: &mpsc::Sender<Frame>) -> bool {
    let Some(raw) = text_of(msg) else { return false };
    if raw.is_empty() || Frame::is_heartbeat(&raw) {
        return true;
    }
    match Frame::decode(&raw) {
        Ok(frame) => from_server.send(frame).await.is_ok(),
        Err(e) => {
            tracing::warn!("dropping malformed frame: {e}");
            true
        },
    }
}

/// Text payload of a socket message. `None` for close frames; control
/// frames (ping/pong) yield an empty string and are skipped by callers.
fn text_of(msg: WsMessage) -> Option<String> {
    match msg {
        WsMessage::Text(t) => Some(t),
        WsMessage::Binary(b) => match String::from_utf8(b) {
            Ok(s) => Some(s),
            Err(_) => {
                tracing::warn!("dropping non-text frame");
                Some(String::new())
            },
        },
        WsMessage::Close(_) => None,
        // Ping/pong are answered by the protocol layer.
        _ => Some(String::new()),
    }
}

/// Failure description carried by an ERROR frame.
fn describe_error(frame: &Frame) -> String {
    frame
        .header("message")
        .map(ToString::to_string)
        .unwrap_or_else(|| {
            if frame.body.is_empty() { "server error".to_string() } else { frame.body.clone() }
        })
}

/// Authority portion of the WebSocket URL, for the CONNECT host header.
fn host_of(ws_url: &str) -> &str {
    let rest = ws_url.split_once("://").map_or(ws_url, |(_, r)| r);
    let authority = &rest[..rest.find('/').unwrap_or(rest.len())];
    if authority.is_empty() { "/" } else { authority }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_extraction() {
        assert_eq!(host_of("ws://chat.example:8080/ws"), "chat.example:8080");
        assert_eq!(host_of("wss://chat.example/ws/chat"), "chat.example");
        assert_eq!(host_of("ws://127.0.0.1:9000"), "127.0.0.1:9000");
        assert_eq!(host_of("/relative"), "/");
    }

    #[test]
    fn error_frame_description_prefers_message_header() {
        let frame = Frame::error("broker unavailable");
        assert_eq!(describe_error(&frame), "broker unavailable");

        let bare = Frame::new(Command::Error).with_body("details");
        assert_eq!(describe_error(&bare), "details");

        let empty = Frame::new(Command::Error);
        assert_eq!(describe_error(&empty), "server error");
    }

    #[tokio::test]
    async fn connect_refused_is_a_connection_error() {
        // Nothing listens on this port.
        let err = connect("ws://127.0.0.1:9", Duration::from_secs(1)).await.err();
        assert!(matches!(err, Some(TransportError::Connection(_))));
    }
}
