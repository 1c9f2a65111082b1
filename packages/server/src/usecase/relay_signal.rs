//! UseCase: WebRTC シグナリングの中継
//!
//! ペイロードの中身は検証せず、送信者の情報を付けて宛先の接続へそのまま転送します。
//! 宛先が存在しない場合は黙って捨てます。

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{
    ConnectionId, ConnectionSession, MessagePushError, MessagePusher, ServerEvent, SignalKind,
};

/// シグナリング中継のユースケース
pub struct RelaySignalUseCase {
    message_pusher: Arc<dyn MessagePusher>,
}

impl RelaySignalUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// シグナリングを宛先に転送
    pub async fn execute(
        &self,
        session: &ConnectionSession,
        kind: SignalKind,
        target: ConnectionId,
        payload: Value,
    ) {
        let signal = ServerEvent::Signal {
            kind,
            from_connection_id: session.connection_id.clone(),
            from_user_id: session.identity.user_id,
            from_user_name: session.identity.user_name.clone(),
            payload,
        };

        match self.message_pusher.push_to(&target, &signal).await {
            Ok(()) => tracing::debug!(
                "Relayed {:?} from '{}' to '{}'",
                kind,
                session.connection_id,
                target
            ),
            Err(MessagePushError::ClientNotFound(_)) => {
                tracing::debug!("Dropped {:?} for unknown connection '{}'", kind, target)
            }
            Err(e) => tracing::debug!("Failed to relay {:?} to '{}': {}", kind, target, e),
        }
    }
}
