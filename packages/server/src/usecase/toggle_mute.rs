//! UseCase: 本人によるミュート切り替え
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ToggleMuteUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - ホストにミュートされた参加者が自分の操作だけで音声を戻せないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：ミュート解除・ミュート
//! - 異常系：ホストミュート中のミュート解除

use std::sync::Arc;

use crate::domain::{
    ConnectionSession, MessagePusher, NoticeKind, RoomRepository, SelfMuteOutcome, ServerEvent,
};

use super::room_access::lock_existing;

/// ミュート切り替えのユースケース
pub struct ToggleMuteUseCase {
    /// Repository（ルームレジストリ）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl ToggleMuteUseCase {
    /// 新しい ToggleMuteUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// ミュート切り替えを実行
    pub async fn execute(&self, session: &ConnectionSession, is_muted: bool) {
        let Some(event_id) = &session.current_room else {
            return;
        };
        let Some(mut room) = lock_existing(self.repository.as_ref(), event_id).await else {
            return;
        };

        match room.apply_self_mute(&session.connection_id, is_muted) {
            SelfMuteOutcome::Updated(participant) => {
                let targets = room.connection_ids();
                if let Err(e) = self
                    .message_pusher
                    .broadcast(&targets, &ServerEvent::participant_updated(participant))
                    .await
                {
                    tracing::warn!("Failed to broadcast participant_updated: {}", e);
                }
            }
            SelfMuteOutcome::RejectedByHostMute => {
                tracing::debug!(
                    "User {} tried to unmute while muted by the host",
                    session.identity.user_id
                );
                if let Err(e) = self
                    .message_pusher
                    .push_to(&session.connection_id, &ServerEvent::notice(NoticeKind::HostMuted))
                    .await
                {
                    tracing::warn!("Failed to send host_muted notice: {}", e);
                }
            }
            SelfMuteOutcome::NotInRoom => {}
        }
    }
}
