//! Shared helpers for the server integration tests.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use yoriai_server::{
    AppState, Server, ServerConfig,
    domain::{PresencePolicy, RoomId, RoomRegistry},
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRegistry},
};
use yoriai_shared::time::SystemClock;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// In-process server bound to an ephemeral port
pub struct TestServer {
    pub addr: SocketAddr,
    registry: Arc<InMemoryRoomRegistry>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().unwrap();

        let policy = PresencePolicy::default();
        let registry = Arc::new(InMemoryRoomRegistry::new());
        let state = Arc::new(AppState::new(
            registry.clone(),
            Arc::new(WebSocketMessagePusher::new()),
            Arc::new(SystemClock),
            policy,
        ));
        let config = ServerConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            presence: policy,
        };

        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            Server::new(state, config)
                .serve(listener, async move {
                    let _ = signal.await;
                })
                .await
                .expect("Server failed");
        });

        Self {
            addr,
            registry,
            shutdown: Some(shutdown),
            handle,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Poll the registry until `room_id` is gone (cleanup runs asynchronously).
    pub async fn wait_until_room_removed(&self, room_id: &str) -> bool {
        let room_id = RoomId::new(room_id.to_string()).unwrap();
        for _ in 0..40 {
            if !self.registry.room_ids().await.contains(&room_id) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.handle.abort();
    }
}

/// WebSocket client speaking the JSON frame protocol
pub struct TestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn connect(server: &TestServer) -> Self {
        let (stream, _) = connect_async(server.ws_url())
            .await
            .expect("Failed to connect");
        Self { stream }
    }

    /// Connect, join `room_id` and consume the `init` frame.
    pub async fn join(server: &TestServer, room_id: &str, id: &str, name: &str) -> (Self, Value) {
        let mut client = Self::connect(server).await;
        client
            .send_json(serde_json::json!({
                "type": "join",
                "roomId": room_id,
                "user": {"id": id, "name": name},
            }))
            .await;
        let init = client.recv_json().await;
        assert_eq!(init["type"], "init");
        (client, init)
    }

    pub async fn send_json(&mut self, value: Value) {
        self.send_text(&value.to_string()).await;
    }

    pub async fn send_text(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("Failed to send frame");
    }

    pub async fn recv_json(&mut self) -> Value {
        loop {
            let message = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .expect("Timed out waiting for frame")
                .expect("Stream closed")
                .expect("WebSocket error");
            if let Message::Text(text) = message {
                return serde_json::from_str(text.as_str()).expect("Invalid JSON frame");
            }
        }
    }

    /// Receive frames until one with the given `type` arrives.
    pub async fn recv_type(&mut self, frame_type: &str) -> Value {
        loop {
            let frame = self.recv_json().await;
            if frame["type"] == frame_type {
                return frame;
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
