//! UseCase: ルーム退出・切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LeaveRoomUseCase::execute() メソッド
//! - 退出通知、空になったルームの破棄、冪等性
//!
//! ### なぜこのテストが必要か
//! - 明示的な退出と切断の両方から呼ばれても、退出がちょうど 1 回だけ処理されることを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の退出と通知
//! - エッジケース：最後の参加者の退出（ルーム破棄）、2 回連続の退出、キック後の退出

use std::sync::Arc;

use nagaya_shared::time::Clock;

use crate::domain::{ConnectionSession, MessagePusher, RoomRepository, event::system_text};

use super::room_access::{lock_existing, release, remove_and_announce};

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    /// Repository（ルームレジストリ）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl LeaveRoomUseCase {
    /// 新しい LeaveRoomUseCase を作成
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

    /// 退出を実行
    ///
    /// 現在のルームがなければ何もしない。明示的な `leave_room` と切断の両方から呼ばれる。
    pub async fn execute(&self, session: &mut ConnectionSession) {
        let Some(event_id) = session.current_room.take() else {
            return;
        };
        let Some(mut room) = lock_existing(self.repository.as_ref(), &event_id).await else {
            return;
        };

        let removed = remove_and_announce(
            &mut room,
            self.message_pusher.as_ref(),
            &self.clock,
            &session.connection_id,
            false,
            |p| system_text::left(p.user_name.as_str()),
        )
        .await;
        if removed.is_some() {
            tracing::info!(
                "User {} left event '{}' ({} remaining)",
                session.identity.user_id,
                event_id,
                room.participant_count()
            );
        }

        release(self.repository.as_ref(), room).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{Fixture, event};

    #[tokio::test]
    async fn test_leave_notifies_remaining_participants() {
        // テスト項目: 退出すると残りの参加者に user_left とシステムメッセージが届く
        // given (前提条件):
        let fx = Fixture::new();
        let mut alice = fx.connect(2, "alice").await;
        let mut bob = fx.connect(3, "bob").await;
        fx.join.execute(&mut alice.session, event("42")).await;
        fx.join.execute(&mut bob.session, event("42")).await;
        alice.drain();

        // when (操作):
        fx.leave.execute(&mut bob.session).await;

        // then (期待する結果):
        let events = alice.drain();
        let left = Fixture::find(&events, "user_left").unwrap();
        assert_eq!(left["userId"], 3);
        assert_eq!(left["userName"], "bob");
        assert_eq!(left["participantCount"], 1);
        assert!(left.get("wasKicked").is_none());
        let chat = Fixture::find(&events, "chat_message").unwrap();
        assert_eq!(chat["text"], "bob left the party");
        assert!(bob.session.current_room.is_none());
    }

    #[tokio::test]
    async fn test_last_leave_destroys_room() {
        // テスト項目: 最後の参加者が退出するとルームが破棄される
        // given (前提条件):
        let fx = Fixture::new();
        let mut alice = fx.connect(2, "alice").await;
        fx.join.execute(&mut alice.session, event("42")).await;
        let handle = fx.room("42").await.unwrap();

        // when (操作):
        fx.leave.execute(&mut alice.session).await;

        // then (期待する結果):
        assert!(fx.room("42").await.is_none());
        assert!(handle.lock().await.is_closed());
    }

    #[tokio::test]
    async fn test_leave_twice_is_noop() {
        // テスト項目: 2 回続けて退出しても 2 回目は何も送らない（冪等性）
        // given (前提条件):
        let fx = Fixture::new();
        let mut alice = fx.connect(2, "alice").await;
        let mut bob = fx.connect(3, "bob").await;
        fx.join.execute(&mut alice.session, event("42")).await;
        fx.join.execute(&mut bob.session, event("42")).await;
        fx.leave.execute(&mut bob.session).await;
        alice.drain();

        // when (操作):
        fx.leave.execute(&mut bob.session).await;

        // then (期待する結果):
        assert!(alice.drain().is_empty());
        let room = fx.room("42").await.unwrap();
        assert_eq!(room.lock().await.participant_count(), 1);
    }

    #[tokio::test]
    async fn test_leave_without_room_is_noop() {
        // テスト項目: どのルームにも参加していない接続の退出は何もしない
        // given (前提条件):
        let fx = Fixture::new();
        let mut alice = fx.connect(2, "alice").await;

        // when (操作):
        fx.leave.execute(&mut alice.session).await;

        // then (期待する結果):
        assert!(alice.drain().is_empty());
        assert!(fx.room("42").await.is_none());
    }

    #[tokio::test]
    async fn test_leave_of_evicted_connection_is_silent() {
        // テスト項目: 重複参加で置き換えられた古い接続の切断は、新しい接続に影響しない
        // given (前提条件):
        let fx = Fixture::new();
        let mut tab1 = fx.connect(2, "alice").await;
        let mut tab2 = fx.connect(2, "alice").await;
        fx.join.execute(&mut tab1.session, event("42")).await;
        fx.join.execute(&mut tab2.session, event("42")).await;
        tab2.drain();

        // when (操作):
        fx.leave.execute(&mut tab1.session).await;

        // then (期待する結果):
        assert!(tab2.drain().is_empty());
        let room = fx.room("42").await.unwrap();
        let room = room.lock().await;
        assert!(room.participant(&tab2.session.connection_id).is_some());
    }
}
