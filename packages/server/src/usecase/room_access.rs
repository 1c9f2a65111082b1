//! ルームのロック取得と、退出処理の共通部分
//!
//! ルームへの変更はすべて `LockedRoom` を保持している間に行い、
//! 同じロックの中でブロードキャストまで済ませます。

use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use nagaya_shared::time::Clock;
use tokio::sync::OwnedMutexGuard;

use crate::domain::{
    ChatMessage, ConnectionId, EventId, MessagePusher, Participant, Room, RoomHandle,
    RoomRepository, ServerEvent, Timestamp,
};

/// ロック済みのルーム
pub struct LockedRoom {
    handle: RoomHandle,
    guard: OwnedMutexGuard<Room>,
}

impl Deref for LockedRoom {
    type Target = Room;

    fn deref(&self) -> &Room {
        &self.guard
    }
}

impl DerefMut for LockedRoom {
    fn deref_mut(&mut self) -> &mut Room {
        &mut self.guard
    }
}

impl LockedRoom {
    /// `handle` が指すルームと同じか
    pub fn is_same_room(&self, handle: &RoomHandle) -> bool {
        Arc::ptr_eq(&self.handle, handle)
    }
}

/// ルームを取得（なければ作成）してロックする
///
/// ロック待ちの間にレジストリから外されたルームは使わず、取り直す。
pub async fn lock_or_create(repository: &dyn RoomRepository, event_id: &EventId) -> LockedRoom {
    loop {
        let handle = repository.get_or_create(event_id).await;
        let guard = handle.clone().lock_owned().await;
        if !guard.is_closed() {
            return LockedRoom { handle, guard };
        }
    }
}

/// 既存のルームをロックする。存在しない・破棄済みなら `None`
pub async fn lock_existing(
    repository: &dyn RoomRepository,
    event_id: &EventId,
) -> Option<LockedRoom> {
    let handle = repository.find(event_id).await?;
    let guard = handle.clone().lock_owned().await;
    if guard.is_closed() {
        return None;
    }
    Some(LockedRoom { handle, guard })
}

/// 参加者がいなくなったルームを破棄する
///
/// ロックを保持したまま `closed` を立ててからレジストリから外すので、
/// ロック待ちしていた他の操作は破棄済みのルームを変更しない。
pub async fn release(repository: &dyn RoomRepository, mut room: LockedRoom) {
    if room.is_empty() {
        room.close();
        let event_id = room.event_id.clone();
        repository.remove_if_current(&event_id, &room.handle).await;
    }
}

/// チャット履歴に追加し、ルームの全員に配信する
pub async fn append_and_broadcast(
    room: &mut LockedRoom,
    message_pusher: &dyn MessagePusher,
    message: ChatMessage,
) {
    room.append_message(message.clone());
    let targets = room.connection_ids();
    if let Err(e) = message_pusher
        .broadcast(&targets, &ServerEvent::ChatMessage(message))
        .await
    {
        tracing::warn!("Failed to broadcast chat message: {}", e);
    }
}

/// 参加者を取り除き、残りの参加者に退出を知らせる
///
/// 通常の退出とキックで共通の処理。参加者がいなければ何もしない。
pub async fn remove_and_announce(
    room: &mut LockedRoom,
    message_pusher: &dyn MessagePusher,
    clock: &Arc<dyn Clock>,
    connection_id: &ConnectionId,
    was_kicked: bool,
    system_text: impl FnOnce(&Participant) -> String,
) -> Option<Participant> {
    let participant = room.remove_participant(connection_id)?;

    let message = ChatMessage::system(
        system_text(&participant),
        Timestamp::new(clock.now_millis()),
    );
    append_and_broadcast(room, message_pusher, message).await;

    let left = ServerEvent::UserLeft {
        participant: participant.clone(),
        participant_count: room.participant_count(),
        was_kicked,
    };
    if let Err(e) = message_pusher.broadcast(&room.connection_ids(), &left).await {
        tracing::warn!("Failed to broadcast user_left: {}", e);
    }

    Some(participant)
}
