//! UseCase: ルーム参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - ホストの解決、重複参加の置き換え、スナップショットと参加通知
//!
//! ### なぜこのテストが必要か
//! - 1 ルームに同じユーザーが 2 人以上存在しないことを保証する
//! - 一度決まったホストが変わらないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：最初の参加者・2 人目以降の参加者
//! - エッジケース：同じユーザーの 2 つ目のタブ、別ルームへの移動、同じルームへの再参加
//! - 異常系：ホスト解決の失敗

use std::sync::Arc;

use nagaya_shared::time::Clock;

use crate::domain::{
    ChatMessage, ConnectionSession, EventId, HostResolver, MessagePusher, Participant, RoomHandle,
    RoomRepository, ServerEvent, Timestamp, UserId, event::system_text,
};

use super::{
    leave_room::LeaveRoomUseCase,
    room_access::{LockedRoom, append_and_broadcast, lock_existing, lock_or_create},
};

/// ロックを取る前のホスト確認の結果
enum HostLookup {
    /// 確認した時点のルームにはホストが決まっていた
    AlreadyKnown(RoomHandle),
    /// HostResolver に問い合わせた（失敗時は `None`）
    Resolved(Option<UserId>),
}

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    /// Repository（ルームレジストリ）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    /// HostResolver（外部のイベント情報）
    host_resolver: Arc<dyn HostResolver>,
    /// 別ルームからの移動時に使う退出処理
    leave_room: Arc<LeaveRoomUseCase>,
    clock: Arc<dyn Clock>,
}

impl JoinRoomUseCase {
    /// 新しい JoinRoomUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        host_resolver: Arc<dyn HostResolver>,
        leave_room: Arc<LeaveRoomUseCase>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            host_resolver,
            leave_room,
            clock,
        }
    }

    /// ルーム参加を実行
    ///
    /// ホストの解決はルームのロックを取る前に済ませる。
    /// 参加者の追加から参加通知のブロードキャストまでは 1 回のロックの中で行う。
    pub async fn execute(&self, session: &mut ConnectionSession, event_id: EventId) {
        // 1. 別のルームにいれば先に退出する
        if let Some(current) = &session.current_room {
            if *current == event_id && self.resend_snapshot(session, &event_id).await {
                return;
            }
            self.leave_room.execute(session).await;
        }

        // 2-3. ホストを解決（ロックの外で待つ）してから、ルームを取得してロック
        let mut room = self.lock_with_host(&event_id).await;

        // 4. 参加者を追加（同じユーザーの古い接続は黙って取り除く）
        let participant = Participant::new(
            session.connection_id.clone(),
            &session.identity,
            Timestamp::new(self.clock.now_millis()),
        );
        if let Some(evicted) = room.admit(participant.clone()) {
            tracing::info!(
                "User {} took over from connection '{}' in event '{}'",
                evicted.user_id,
                evicted.connection_id,
                event_id
            );
        }
        session.current_room = Some(event_id.clone());
        tracing::info!(
            "User {} ('{}') joined event '{}' on connection '{}'",
            session.identity.user_id,
            session.identity.user_name,
            event_id,
            session.connection_id
        );

        // 5. 参加者本人にスナップショットを返す
        let snapshot = room.snapshot_for(session.identity.user_id);
        if let Err(e) = self
            .message_pusher
            .push_to(&session.connection_id, &ServerEvent::RoomState(snapshot))
            .await
        {
            tracing::warn!("Failed to send room_state to '{}': {}", session.connection_id, e);
        }

        // 6. 参加のシステムメッセージ
        let message = ChatMessage::system(
            system_text::joined(session.identity.user_name.as_str()),
            Timestamp::new(self.clock.now_millis()),
        );
        append_and_broadcast(&mut room, self.message_pusher.as_ref(), message).await;

        // 7. 他の参加者に通知
        let joined = ServerEvent::UserJoined {
            participant: room.view(&participant),
            participant_count: room.participant_count(),
        };
        let others = room.connection_ids_except(&session.connection_id);
        if let Err(e) = self.message_pusher.broadcast(&others, &joined).await {
            tracing::warn!("Failed to broadcast user_joined: {}", e);
        }
    }

    /// すでに同じルームに参加している場合はスナップショットだけ送り直す
    ///
    /// キックなどで参加者から外れていた場合は `false`
    async fn resend_snapshot(&self, session: &ConnectionSession, event_id: &EventId) -> bool {
        let Some(room) = lock_existing(self.repository.as_ref(), event_id).await else {
            return false;
        };
        if room.participant(&session.connection_id).is_none() {
            return false;
        }
        let snapshot = room.snapshot_for(session.identity.user_id);
        if let Err(e) = self
            .message_pusher
            .push_to(&session.connection_id, &ServerEvent::RoomState(snapshot))
            .await
        {
            tracing::warn!("Failed to send room_state to '{}': {}", session.connection_id, e);
        }
        true
    }

    /// ホストを解決したうえでルームをロックする
    ///
    /// 確認の後にルームが破棄・再作成されてホストが未設定になっていたら、
    /// ロックを手放して解決からやり直す。
    async fn lock_with_host(&self, event_id: &EventId) -> LockedRoom {
        loop {
            let lookup = self.resolve_host_if_needed(event_id).await;
            let mut room = lock_or_create(self.repository.as_ref(), event_id).await;
            match lookup {
                HostLookup::Resolved(Some(host)) => {
                    if room.set_host_if_unset(host) {
                        tracing::info!("Host of event '{}' resolved to user {}", event_id, host);
                    }
                }
                HostLookup::Resolved(None) => {}
                HostLookup::AlreadyKnown(checked) => {
                    if !room.is_same_room(&checked) && room.host_user_id().is_none() {
                        tracing::debug!(
                            "Room of event '{}' was recreated during host lookup, retrying",
                            event_id
                        );
                        continue;
                    }
                }
            }
            return room;
        }
    }

    /// ホストが未設定のルームについてだけ HostResolver に問い合わせる
    ///
    /// 失敗した場合はホストなしで参加を続ける。
    async fn resolve_host_if_needed(&self, event_id: &EventId) -> HostLookup {
        if let Some(handle) = self.repository.find(event_id).await {
            let known = {
                let room = handle.lock().await;
                !room.is_closed() && room.host_user_id().is_some()
            };
            if known {
                return HostLookup::AlreadyKnown(handle);
            }
        }

        match self.host_resolver.resolve_host(event_id).await {
            Ok(host) => HostLookup::Resolved(host),
            Err(e) => {
                tracing::warn!("Failed to resolve host for event '{}': {}", event_id, e);
                HostLookup::Resolved(None)
            }
        }
    }
}
