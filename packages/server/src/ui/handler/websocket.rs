//! WebSocket connection handlers.
//!
//! 1 接続につき 1 タスクで受信フレームを順に処理し、送信は `pusher_loop` が担当します。
//! 接続のセッション（認証済みの ID と現在のルーム）はこのタスクだけが持ちます。

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, header},
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    domain::{
        ConnectionId, ConnectionIdFactory, ConnectionSession, Credential, EventId, ServerEvent,
        SignalKind,
    },
    infrastructure::dto::websocket::{ClientMessage, ServerMessage},
    ui::state::AppState,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

const SESSION_COOKIE: &str = "session";

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ConnectQuery>,
) -> impl IntoResponse {
    let credential = extract_credential(&headers, query.token);
    let connection_id = ConnectionIdFactory::generate();

    // 認証に失敗した場合も auth_error を届けるためにアップグレードする
    ws.on_upgrade(move |socket| handle_socket(socket, state, connection_id, credential))
}

/// `Authorization: Bearer` → `session` クッキー → `token` クエリの順に探す
fn extract_credential(headers: &HeaderMap, query_token: Option<String>) -> Option<Credential> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    let cookie = || {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.to_string())
    };

    [bearer, cookie(), query_token]
        .into_iter()
        .flatten()
        .find_map(|token| Credential::new(token).ok())
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// The task ends when the queue is closed (the connection was unregistered from
/// the pusher) or the socket can no longer be written to.
fn pusher_loop(
    mut rx: mpsc::Receiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    connection_id: ConnectionId,
    credential: Option<Credential>,
) {
    let (mut sender, mut receiver) = socket.split();

    // 1. 認証（失敗したら auth_error を送って閉じる）
    let identity = match state.authenticate_usecase.execute(credential).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!("Authentication failed for connection '{}': {}", connection_id, e);
            let event = ServerEvent::AuthError {
                message: e.to_string(),
            };
            match serde_json::to_string(&ServerMessage::from(&event)) {
                Ok(json) => {
                    let _ = sender.send(Message::Text(json.into())).await;
                }
                Err(e) => tracing::error!("Failed to encode auth_error: {}", e),
            }
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    // 2. 送信キューを登録
    let (tx, rx) = mpsc::channel(state.outbound_buffer);
    state
        .message_pusher
        .register_client(connection_id.clone(), tx)
        .await;
    tracing::info!(
        "Connection '{}' accepted for user {} ('{}')",
        connection_id,
        identity.user_id,
        identity.user_name
    );
    let mut session = ConnectionSession::new(connection_id.clone(), identity);
    let mut send_task = pusher_loop(rx, sender);

    // 3. 受信ループ
    //
    // select! で待つのはフレームの受信だけで、フレームの処理は最後まで走らせる。
    loop {
        let frame = tokio::select! {
            frame = receiver.next() => frame,
            _ = &mut send_task => {
                tracing::info!("Outbound queue of '{}' closed", connection_id);
                break;
            }
        };

        match frame {
            Some(Ok(Message::Text(text))) => dispatch(&state, &mut session, text.as_str()).await,
            Some(Ok(Message::Close(_))) => {
                tracing::info!("Connection '{}' requested close", connection_id);
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::debug!("WebSocket error on '{}': {}", connection_id, e);
                break;
            }
            None => break,
        }
    }

    // 4. 切断処理（1 回だけ）
    state.leave_room_usecase.execute(&mut session).await;
    state.message_pusher.unregister_client(&connection_id).await;
    send_task.abort();
    tracing::info!("Connection '{}' closed", connection_id);
}

/// 受信フレーム 1 つを対応するユースケースに渡す
async fn dispatch(state: &AppState, session: &mut ConnectionSession, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(
                "Ignored malformed frame from '{}': {}",
                session.connection_id,
                e
            );
            return;
        }
    };
    tracing::debug!("Received from '{}': {:?}", session.connection_id, message);

    match message {
        ClientMessage::JoinRoom { event_id } => match EventId::new(event_id) {
            Ok(event_id) => state.join_room_usecase.execute(session, event_id).await,
            Err(e) => tracing::debug!("Ignored join_room: {}", e),
        },
        ClientMessage::LeaveRoom => state.leave_room_usecase.execute(session).await,
        ClientMessage::ChatMessage { text } => {
            state.send_chat_message_usecase.execute(session, text).await
        }
        ClientMessage::ToggleMute { is_muted } => {
            state.toggle_mute_usecase.execute(session, is_muted).await
        }
        ClientMessage::SpeakingState { is_speaking } => {
            state.set_speaking_usecase.execute(session, is_speaking).await
        }
        ClientMessage::HostMuteUser { target_user_id } => {
            state.moderation_usecase.mute_user(session, target_user_id).await
        }
        ClientMessage::HostUnmuteUser { target_user_id } => {
            state
                .moderation_usecase
                .unmute_user(session, target_user_id)
                .await
        }
        ClientMessage::HostKickUser { target_user_id } => {
            state.moderation_usecase.kick_user(session, target_user_id).await
        }
        ClientMessage::HostMuteAll => state.moderation_usecase.mute_all(session).await,
        ClientMessage::WebrtcOffer {
            target_connection_id,
            offer,
        } => relay(state, session, SignalKind::Offer, target_connection_id, offer).await,
        ClientMessage::WebrtcAnswer {
            target_connection_id,
            answer,
        } => relay(state, session, SignalKind::Answer, target_connection_id, answer).await,
        ClientMessage::WebrtcIceCandidate {
            target_connection_id,
            candidate,
        } => {
            relay(
                state,
                session,
                SignalKind::IceCandidate,
                target_connection_id,
                candidate,
            )
            .await
        }
    }
}

async fn relay(
    state: &AppState,
    session: &ConnectionSession,
    kind: SignalKind,
    target: String,
    payload: Value,
) {
    match ConnectionId::new(target) {
        Ok(target) => {
            state
                .relay_signal_usecase
                .execute(session, kind, target, payload)
                .await
        }
        Err(e) => tracing::debug!("Ignored {:?}: {}", kind, e),
    }
}
