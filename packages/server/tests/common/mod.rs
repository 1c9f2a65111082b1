//! Integration test harness: an in-process server and WebSocket test clients.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use nagaya_server::{infrastructure::resolver::StaticDirectory, ui::Server, ui::state::AppState};
use nagaya_shared::time::SystemClock;
use serde_json::{Value, json};
use tokio::{net::TcpStream, sync::oneshot};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, client::IntoClientRequest, http::HeaderValue},
};

/// host (1) はイベント 42 のホスト
pub const DIRECTORY: &str = r#"{
    "users": [
        { "token": "t-host",  "userId": 1, "userName": "host" },
        { "token": "t-alice", "userId": 2, "userName": "alice" },
        { "token": "t-bob",   "userId": 3, "userName": "bob" },
        { "token": "t-carol", "userId": 4, "userName": "carol" },
        { "token": "t-dave",  "userId": 5, "userName": "dave" }
    ],
    "events": [{ "eventId": "42", "hostUserId": 1 }]
}"#;

const RECV_TIMEOUT: Duration = Duration::from_secs(3);

/// Helper struct to manage the in-process server lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a test server on an ephemeral port
    pub async fn start() -> Self {
        let directory = Arc::new(StaticDirectory::from_json(DIRECTORY).unwrap());
        let state = AppState::build(directory.clone(), directory, Arc::new(SystemClock), 256);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(Server::new(state).serve(listener, async move {
            let _ = rx.await;
        }));

        TestServer {
            addr,
            shutdown: Some(tx),
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// `?token=` でつなぐ
    pub async fn connect(&self, token: &str) -> TestClient {
        let url = format!("{}?token={}", self.ws_url(), token);
        let (ws, _) = connect_async(url).await.unwrap();
        TestClient { ws }
    }

    /// `Authorization: Bearer` ヘッダーでつなぐ
    pub async fn connect_with_bearer(&self, token: &str) -> TestClient {
        let mut request = self.ws_url().into_client_request().unwrap();
        request.headers_mut().insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        let (ws, _) = connect_async(request).await.unwrap();
        TestClient { ws }
    }

    /// 接続してイベント 42 に参加し、room_state の data を返す
    pub async fn join(&self, token: &str, event_id: &str) -> (TestClient, Value) {
        let mut client = self.connect(token).await;
        let state = client.join(event_id).await;
        (client, state)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn send(&mut self, event: &str, data: Value) {
        let frame = json!({ "event": event, "data": data });
        self.ws
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .unwrap();
    }

    pub async fn join(&mut self, event_id: &str) -> Value {
        self.send("join_room", json!({ "eventId": event_id })).await;
        self.recv_event("room_state").await
    }

    /// 次のテキストフレーム（`{"event", "data"}`）。接続が閉じたら `None`
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a frame");
            match frame {
                Some(Ok(Message::Text(text))) => {
                    return Some(serde_json::from_str(text.as_str()).unwrap());
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
                Some(Ok(_)) => continue,
            }
        }
    }

    /// `name` イベントが来るまで読み進め、その `data` を返す
    pub async fn recv_event(&mut self, name: &str) -> Value {
        loop {
            match self.recv().await {
                Some(envelope) if envelope["event"] == name => return envelope["data"].clone(),
                Some(_) => continue,
                None => panic!("connection closed while waiting for '{name}'"),
            }
        }
    }

    /// `duration` の間に届いたフレームをすべて返す
    pub async fn collect_for(&mut self, duration: Duration) -> Vec<Value> {
        let mut events = Vec::new();
        let deadline = tokio::time::Instant::now() + duration;
        while let Ok(Some(frame)) = tokio::time::timeout_at(deadline, self.ws.next()).await {
            if let Ok(Message::Text(text)) = frame {
                events.push(serde_json::from_str(text.as_str()).unwrap());
            }
        }
        events
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

/// 指定した名前のイベントだけを取り出す
pub fn events_named<'a>(events: &'a [Value], name: &str) -> Vec<&'a Value> {
    events
        .iter()
        .filter(|envelope| envelope["event"] == name)
        .map(|envelope| &envelope["data"])
        .collect()
}
