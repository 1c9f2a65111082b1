//! UseCase: ホストによるモデレーション（ミュート・ミュート解除・キック・全員ミュート）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ModerationUseCase の mute_user / unmute_user / kick_user / mute_all
//!
//! ### なぜこのテストが必要か
//! - ホスト以外が操作しても状態が変わらないことを保証する
//! - ホストにミュートされた参加者がホストの許可なしに音声を戻せないことを保証する
//! - キックされた参加者に 2 種類の通知が順に届くことを確認する
//!
//! ### どのような状況を想定しているか
//! - 正常系：ホストによる各操作
//! - 異常系：ホスト以外からの操作、自分自身を対象にした操作
//! - エッジケース：対象が既にいない、既にホストミュート済み

use std::sync::Arc;

use nagaya_shared::time::Clock;

use crate::domain::{
    ChatMessage, ConnectionId, ConnectionSession, HostMuteOutcome, MessagePusher,
    ModerationError, NoticeKind, Participant, RoomRepository, ServerEvent, Timestamp, UserId,
    event::system_text,
};

use super::room_access::{
    LockedRoom, append_and_broadcast, lock_existing, release, remove_and_announce,
};

/// ホストのモデレーション操作
pub struct ModerationUseCase {
    /// Repository（ルームレジストリ）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ModerationUseCase {
    /// 新しい ModerationUseCase を作成
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

    /// 対象ユーザーをホストミュートする
    pub async fn mute_user(&self, session: &ConnectionSession, target: i64) {
        let Some(mut room) = self.lock_as_participant(session).await else {
            return;
        };
        let result = room.host_mute(session.identity.user_id, UserId::new(target));
        if let Some(HostMuteOutcome::Applied(participant)) = self.check(session, result).await {
            tracing::info!(
                "Host {} muted user {} in event '{}'",
                session.identity.user_id,
                participant.user_id,
                room.event_id
            );
            self.announce_mute_change(
                &mut room,
                participant,
                system_text::muted_by_host,
                NoticeKind::MutedByHost,
            )
            .await;
        }
    }

    /// 対象ユーザーのホストミュートを解除する
    ///
    /// 解除後も本人のミュートは維持され、音声を戻すかどうかは本人が決める。
    pub async fn unmute_user(&self, session: &ConnectionSession, target: i64) {
        let Some(mut room) = self.lock_as_participant(session).await else {
            return;
        };
        let result = room.host_unmute(session.identity.user_id, UserId::new(target));
        if let Some(HostMuteOutcome::Applied(participant)) = self.check(session, result).await {
            tracing::info!(
                "Host {} unmuted user {} in event '{}'",
                session.identity.user_id,
                participant.user_id,
                room.event_id
            );
            self.announce_mute_change(
                &mut room,
                participant,
                system_text::unmuted_by_host,
                NoticeKind::UnmutedByHost,
            )
            .await;
        }
    }

    /// 対象ユーザーをルームから退出させる
    pub async fn kick_user(&self, session: &ConnectionSession, target: i64) {
        let Some(mut room) = self.lock_as_participant(session).await else {
            return;
        };
        let result = room.kick_target(session.identity.user_id, UserId::new(target));
        let Some(Some(connection_id)) = self.check(session, result).await else {
            return;
        };

        // 1. 削除前の通知
        self.push(&connection_id, &ServerEvent::notice(NoticeKind::Kicked))
            .await;

        // 2. 削除して残りの参加者に知らせる
        let removed = remove_and_announce(
            &mut room,
            self.message_pusher.as_ref(),
            &self.clock,
            &connection_id,
            true,
            |p| system_text::kicked(p.user_name.as_str()),
        )
        .await;

        // 3. 退出を促す通知
        if let Some(participant) = removed {
            tracing::info!(
                "Host {} kicked user {} from event '{}'",
                session.identity.user_id,
                participant.user_id,
                room.event_id
            );
            self.push(&connection_id, &ServerEvent::kicked_from_room())
                .await;
        }

        release(self.repository.as_ref(), room).await;
    }

    /// ホスト以外の全員をホストミュートする
    pub async fn mute_all(&self, session: &ConnectionSession) {
        let Some(mut room) = self.lock_as_participant(session).await else {
            return;
        };
        let result = room.host_mute_all(session.identity.user_id);
        let Some(muted) = self.check(session, result).await else {
            return;
        };
        tracing::info!(
            "Host {} muted all {} participant(s) in event '{}'",
            session.identity.user_id,
            muted.len(),
            room.event_id
        );

        let message = ChatMessage::system(
            system_text::MUTED_ALL,
            Timestamp::new(self.clock.now_millis()),
        );
        append_and_broadcast(&mut room, self.message_pusher.as_ref(), message).await;

        let everyone = room.connection_ids();
        for participant in muted {
            self.push(
                &participant.connection_id,
                &ServerEvent::notice(NoticeKind::MutedByHost),
            )
            .await;
            if let Err(e) = self
                .message_pusher
                .broadcast(&everyone, &ServerEvent::participant_updated(participant))
                .await
            {
                tracing::warn!("Failed to broadcast participant_updated: {}", e);
            }
        }
    }

    /// 要求者が参加しているルームをロックする
    async fn lock_as_participant(&self, session: &ConnectionSession) -> Option<LockedRoom> {
        let event_id = session.current_room.as_ref()?;
        let room = lock_existing(self.repository.as_ref(), event_id).await?;
        room.participant(&session.connection_id)?;
        Some(room)
    }

    /// 権限エラーを要求者に返す
    ///
    /// ホスト以外なら `not_host` を通知し、自分自身が対象なら黙って捨てる。
    async fn check<T>(
        &self,
        session: &ConnectionSession,
        result: Result<T, ModerationError>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(ModerationError::NotHost) => {
                tracing::debug!(
                    "User {} attempted a host-only action",
                    session.identity.user_id
                );
                self.push(&session.connection_id, &ServerEvent::notice(NoticeKind::NotHost))
                    .await;
                None
            }
            Err(e @ ModerationError::SelfTarget) => {
                tracing::debug!("Ignored moderation from {}: {}", session.identity.user_id, e);
                None
            }
        }
    }

    async fn announce_mute_change(
        &self,
        room: &mut LockedRoom,
        participant: Participant,
        system_text: fn(&str) -> String,
        notice: NoticeKind,
    ) {
        let message = ChatMessage::system(
            system_text(participant.user_name.as_str()),
            Timestamp::new(self.clock.now_millis()),
        );
        append_and_broadcast(room, self.message_pusher.as_ref(), message).await;

        self.push(&participant.connection_id, &ServerEvent::notice(notice))
            .await;

        let everyone = room.connection_ids();
        if let Err(e) = self
            .message_pusher
            .broadcast(&everyone, &ServerEvent::participant_updated(participant))
            .await
        {
            tracing::warn!("Failed to broadcast participant_updated: {}", e);
        }
    }

    async fn push(&self, connection_id: &ConnectionId, event: &ServerEvent) {
        if let Err(e) = self.message_pusher.push_to(connection_id, event).await {
            tracing::warn!("Failed to send to '{}': {}", connection_id, e);
        }
    }
}
