//! UseCase: チャットメッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendChatMessageUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 送信者を含むルーム全員に配信されることを確認
//! - 不正な本文やルーム外からの送信が黙って捨てられることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：メッセージの配信と履歴への追加
//! - 異常系：空文字、500 文字超、未参加の接続

use std::sync::Arc;

use nagaya_shared::time::Clock;

use crate::domain::{
    ChatMessage, ChatText, ConnectionSession, MessagePusher, RoomRepository, Timestamp,
};

use super::room_access::{append_and_broadcast, lock_existing};

/// チャット送信のユースケース
pub struct SendChatMessageUseCase {
    /// Repository（ルームレジストリ）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl SendChatMessageUseCase {
    /// 新しい SendChatMessageUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            clock,
        }
    }

    /// メッセージ送信を実行
    ///
    /// 本文は前後の空白を除いて 1〜500 文字。条件を満たさない場合や、
    /// 接続がルームに参加していない場合は何もしない。
    pub async fn execute(&self, session: &ConnectionSession, text: String) {
        let Some(event_id) = &session.current_room else {
            return;
        };
        let text = match ChatText::new(text) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("Dropped chat message from '{}': {}", session.connection_id, e);
                return;
            }
        };
        let Some(mut room) = lock_existing(self.repository.as_ref(), event_id).await else {
            return;
        };
        if room.participant(&session.connection_id).is_none() {
            return;
        }

        let message = ChatMessage::from_user(
            &session.identity,
            text,
            Timestamp::new(self.clock.now_millis()),
        );
        append_and_broadcast(&mut room, self.message_pusher.as_ref(), message).await;
    }
}
