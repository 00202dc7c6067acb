//! Helpers for running the real server in-process and driving it over WebSocket.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use luconnect_server::{
    config::ServerConfig,
    domain::MessageStore,
    infrastructure::{
        auth::InMemoryAuthGateway,
        dto::websocket::{ClientFrame, ServerFrame},
        store::InMemoryMessageStore,
    },
    ui::Server,
};
use luconnect_shared::time::SystemClock;
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

pub const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Server running on an ephemeral port inside the test process
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<InMemoryMessageStore>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    pub async fn start_with(config: ServerConfig) -> Self {
        let store = Arc::new(InMemoryMessageStore::new());
        let message_store: Arc<dyn MessageStore> = store.clone();
        let server = Server::from_config(
            &config,
            Arc::new(InMemoryAuthGateway::new()),
            message_store,
            Arc::new(SystemClock),
        )
        .expect("valid config");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = server.serve(listener, shutdown).await {
                panic!("server error: {e}");
            }
        });

        TestServer {
            addr,
            store,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger graceful shutdown and wait for the server to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(Duration::from_secs(10), handle)
                .await
                .expect("server stops in time")
                .expect("server task does not panic");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// WebSocket client speaking the JSON frame protocol
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect and consume the `auth-start` frame.
    pub async fn connect(url: &str) -> Self {
        let (ws, _) = connect_async(url).await.expect("connect");
        let mut client = TestClient { ws };
        let frame = client.recv().await;
        assert!(
            matches!(frame, ServerFrame::AuthStart { .. }),
            "expected auth-start, got {frame:?}"
        );
        client
    }

    /// Connect, register `username` and wait for `auth-ok`.
    pub async fn register(url: &str, username: &str) -> Self {
        let mut client = Self::connect(url).await;
        client
            .send(&ClientFrame::Register {
                username: username.to_string(),
                password: "password".to_string(),
            })
            .await;
        let frame = client.recv().await;
        assert_eq!(
            frame,
            ServerFrame::AuthOk {
                username: username.to_string(),
            }
        );
        client
    }

    pub async fn send(&mut self, frame: &ClientFrame) {
        let json = serde_json::to_string(frame).expect("serialize");
        self.ws
            .send(Message::Text(json.into()))
            .await
            .expect("send frame");
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("send text");
    }

    pub async fn send_line(&mut self, text: &str) {
        self.send(&ClientFrame::Line {
            text: text.to_string(),
        })
        .await;
    }

    /// Next server frame (panics after `FRAME_TIMEOUT`).
    pub async fn recv(&mut self) -> ServerFrame {
        self.try_recv(FRAME_TIMEOUT)
            .await
            .expect("frame within timeout")
    }

    /// Next server frame, or `None` on timeout or close.
    pub async fn try_recv(&mut self, timeout: Duration) -> Option<ServerFrame> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let message = tokio::time::timeout_at(deadline, self.ws.next())
                .await
                .ok()??;
            match message {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(&text).expect("valid server frame"));
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    /// Skip frames until one matches `predicate`.
    pub async fn recv_until(&mut self, predicate: impl Fn(&ServerFrame) -> bool) -> ServerFrame {
        loop {
            let frame = self.recv().await;
            if predicate(&frame) {
                return frame;
            }
        }
    }

    /// Frames received within `window`
    pub async fn drain(&mut self, window: Duration) -> Vec<ServerFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = self.try_recv(window).await {
            frames.push(frame);
        }
        frames
    }

    /// True once the server has closed the connection.
    pub async fn is_closed(&mut self) -> bool {
        let deadline = tokio::time::Instant::now() + FRAME_TIMEOUT;
        loop {
            match tokio::time::timeout_at(deadline, self.ws.next()).await {
                Err(_) => return false,
                Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
                Ok(Some(Ok(_))) => continue,
            }
        }
    }
}

/// Register `username` and wait until it is admitted.
pub async fn join_active(url: &str, username: &str) -> TestClient {
    let mut client = TestClient::register(url, username).await;
    let frame = client.recv().await;
    assert_eq!(
        frame,
        ServerFrame::Admitted {
            username: username.to_string(),
        }
    );
    client
}
