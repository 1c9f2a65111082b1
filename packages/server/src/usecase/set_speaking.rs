//! UseCase: 発話状態の更新
//!
//! 高頻度で届くため、状態が変わったときだけ他の参加者へ配信します。
//! 配信は `Delivery::BestEffort` で、送信キューが詰まっていれば捨てられます。

use std::sync::Arc;

use crate::domain::{
    ConnectionSession, MessagePusher, RoomRepository, ServerEvent, SpeakingOutcome,
};

use super::room_access::lock_existing;

/// 発話状態更新のユースケース
pub struct SetSpeakingUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl SetSpeakingUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    pub async fn execute(&self, session: &ConnectionSession, is_speaking: bool) {
        let Some(event_id) = &session.current_room else {
            return;
        };
        let Some(mut room) = lock_existing(self.repository.as_ref(), event_id).await else {
            return;
        };

        if let SpeakingOutcome::Changed(participant) =
            room.set_speaking(&session.connection_id, is_speaking)
        {
            let others = room.connection_ids_except(&session.connection_id);
            if let Err(e) = self
                .message_pusher
                .broadcast(&others, &ServerEvent::speaking_updated(participant))
                .await
            {
                tracing::debug!("Failed to broadcast speaking state: {}", e);
            }
        }
    }
}
