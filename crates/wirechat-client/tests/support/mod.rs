//! In-process servers for integration tests.
//!
//! [`StompServer`] speaks just enough of the push protocol to drive the
//! client end-to-end: it answers CONNECT, records every frame a client
//! sends, and can push MESSAGE frames or kick the active client. The canned
//! HTTP responder answers every request with one fixed response, which is
//! all the degrade-to-empty history tests need.

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};
use wirechat_proto::{Command, Frame};

/// How the server answers a CONNECT frame.
#[derive(Clone, Copy, PartialEq)]
enum HandshakePolicy {
    Accept,
    Reject,
}

struct ServerState {
    connections: AtomicUsize,
    policy: HandshakePolicy,
    received: Mutex<Vec<Frame>>,
    push_tx: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
    kick_tx: Mutex<Option<mpsc::UnboundedSender<()>>>,
}

/// Minimal in-process push server.
pub struct StompServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl StompServer {
    /// Server that accepts handshakes.
    pub async fn start() -> Self {
        Self::start_with(HandshakePolicy::Accept).await
    }

    /// Server that answers every CONNECT with an ERROR frame and closes.
    pub async fn start_rejecting() -> Self {
        Self::start_with(HandshakePolicy::Reject).await
    }

    async fn start_with(policy: HandshakePolicy) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ServerState {
            connections: AtomicUsize::new(0),
            policy,
            received: Mutex::new(Vec::new()),
            push_tx: Mutex::new(None),
            kick_tx: Mutex::new(None),
        });

        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                let state = Arc::clone(&accept_state);
                state.connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let _ = serve_client(stream, state).await;
                });
            }
        });

        Self { addr, state }
    }

    /// WebSocket URL of this server.
    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Number of socket connections accepted so far.
    pub fn connection_count(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Frames received from clients so far (CONNECT excluded).
    pub fn received(&self) -> Vec<Frame> {
        self.state.received.lock().unwrap().clone()
    }

    /// Push a frame to the active client.
    pub fn push(&self, frame: Frame) {
        let guard = self.state.push_tx.lock().unwrap();
        guard.as_ref().expect("no active client").send(frame).unwrap();
    }

    /// Drop the active client's socket without a close handshake.
    pub fn kick(&self) {
        let guard = self.state.kick_tx.lock().unwrap();
        guard.as_ref().expect("no active client").send(()).unwrap();
    }

    /// Wait until a received frame matches, then return it.
    pub async fn wait_for(&self, pred: impl Fn(&Frame) -> bool) -> Frame {
        for _ in 0..200 {
            if let Some(frame) = self.received().into_iter().find(&pred) {
                return frame;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("frame not received within 2s");
    }

    /// Number of received frames with the given command.
    pub fn count_of(&self, command: Command) -> usize {
        self.received().iter().filter(|f| f.command == command).count()
    }
}

async fn serve_client(stream: TcpStream, state: Arc<ServerState>) -> Result<(), ()> {
    let socket = accept_async(stream).await.map_err(|_| ())?;
    let (mut sink, mut source) = socket.split();

    // Handshake: first real frame must be CONNECT.
    loop {
        let msg = source.next().await.ok_or(())?.map_err(|_| ())?;
        let WsMessage::Text(raw) = msg else { continue };
        if Frame::is_heartbeat(&raw) {
            continue;
        }
        let frame = Frame::decode(&raw).map_err(|_| ())?;
        assert_eq!(frame.command, Command::Connect, "client must CONNECT first");
        break;
    }

    if state.policy == HandshakePolicy::Reject {
        let error = Frame::error("access denied").encode();
        let _ = sink.send(WsMessage::Text(error)).await;
        let _ = sink.close().await;
        return Ok(());
    }

    let (push_tx, mut push_rx) = mpsc::unbounded_channel();
    let (kick_tx, mut kick_rx) = mpsc::unbounded_channel();
    *state.push_tx.lock().unwrap() = Some(push_tx);
    *state.kick_tx.lock().unwrap() = Some(kick_tx);

    let connected = Frame::new(Command::Connected).with_header("version", "1.2").encode();
    sink.send(WsMessage::Text(connected)).await.map_err(|_| ())?;

    loop {
        tokio::select! {
            inbound = source.next() => {
                match inbound {
                    Some(Ok(WsMessage::Text(raw))) => {
                        if Frame::is_heartbeat(&raw) {
                            continue;
                        }
                        if let Ok(frame) = Frame::decode(&raw) {
                            state.received.lock().unwrap().push(frame);
                        }
                    },
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {},
                    Some(Err(_)) => break,
                }
            },
            outbound = push_rx.recv() => {
                let Some(frame) = outbound else { break };
                sink.send(WsMessage::Text(frame.encode())).await.map_err(|_| ())?;
            },
            _ = kick_rx.recv() => {
                // Drop the socket without a close handshake.
                break;
            },
        }
    }

    Ok(())
}

/// Serve one fixed HTTP response to every request.
pub async fn canned_http(response: String) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { break };
            let response = response.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                // Read request headers; the bodies we serve are GET-only.
                while read < buf.len() {
                    match stream.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            read += n;
                            if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        },
                    }
                }
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    addr
}

/// Canned HTTP response with the given status line and JSON body.
pub fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Poll until `check` passes, panicking after ~2s.
pub async fn eventually(what: &str, check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s: {what}");
}
