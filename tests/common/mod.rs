//! Shared utilities for integration tests.
//!
//! Provides an in-process MRC server double:
//! - `MockServer` accepts WebSocket connections on a random local port
//! - `MockPeer` is one accepted socket, driven by the test

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mrc_client::{MrcClient, ReconnectPolicy};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for anything a test waits on.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Reconnect delay used by test clients.
pub const RETRY_DELAY: Duration = Duration::from_millis(50);

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing once per test binary.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mrc_client=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Builds a client that reconnects quickly.
pub fn fast_client(url: &str) -> MrcClient {
    MrcClient::builder()
        .endpoint(url)
        .reconnect(ReconnectPolicy::fixed(RETRY_DELAY))
        .build()
        .expect("client should build")
}

// ============================================================================
// MockServer
// ============================================================================

/// WebSocket server that hands every accepted socket to the test.
pub struct MockServer {
    url: String,
    peers: mpsc::UnboundedReceiver<MockPeer>,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Binds to `127.0.0.1:0` and starts accepting.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let port = listener.local_addr().expect("local addr").port();
        let (tx, peers) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                if let Ok(ws) = accept_async(stream).await
                    && tx.send(MockPeer { ws }).is_err()
                {
                    break;
                }
            }
        });

        Self {
            url: format!("ws://127.0.0.1:{port}/ws"),
            peers,
            task,
        }
    }

    /// Returns the endpoint clients should use.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Waits for the next client connection.
    pub async fn accept(&mut self) -> MockPeer {
        self.try_accept(STEP_TIMEOUT)
            .await
            .expect("client should connect")
    }

    /// Waits up to `wait` for the next client connection.
    pub async fn try_accept(&mut self, wait: Duration) -> Option<MockPeer> {
        timeout(wait, self.peers.recv()).await.ok().flatten()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// MockPeer
// ============================================================================

/// Server side of one client connection.
pub struct MockPeer {
    ws: WebSocketStream<TcpStream>,
}

impl MockPeer {
    /// Receives the next JSON text frame.
    pub async fn recv_json(&mut self) -> Value {
        loop {
            let message = timeout(STEP_TIMEOUT, self.ws.next())
                .await
                .expect("frame within timeout")
                .expect("socket open")
                .expect("valid frame");

            if let Message::Text(text) = message {
                return serde_json::from_str(&text).expect("client sent JSON");
            }
        }
    }

    /// Returns `true` if no frame arrives within `wait`.
    pub async fn is_silent_for(&mut self, wait: Duration) -> bool {
        timeout(wait, self.ws.next()).await.is_err()
    }

    /// Sends a JSON text frame.
    pub async fn send_json(&mut self, value: Value) {
        self.send_text(&value.to_string()).await;
    }

    /// Sends a raw text frame.
    pub async fn send_text(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.into()))
            .await
            .expect("send to client");
    }

    /// Closes the socket from the server side.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
        while let Ok(Some(Ok(_))) = timeout(STEP_TIMEOUT, self.ws.next()).await {}
    }

    /// Starts the close handshake and reports whether the client answered
    /// it with its own close frame.
    pub async fn close_handshake(mut self) -> bool {
        self.ws.close(None).await.expect("send close frame");
        loop {
            match timeout(STEP_TIMEOUT, self.ws.next()).await {
                Ok(Some(Ok(Message::Close(_)))) => return true,
                Ok(Some(Ok(_))) => {}
                Ok(Some(Err(_)) | None) | Err(_) => return false,
            }
        }
    }

    /// Reads until the client closes the socket.
    pub async fn wait_closed(mut self) {
        loop {
            match timeout(STEP_TIMEOUT, self.ws.next())
                .await
                .expect("client should close")
            {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
        // Flush the close reply.
        let _ = timeout(STEP_TIMEOUT, self.ws.next()).await;
    }
}
