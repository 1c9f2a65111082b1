//! UseCase: ルーム一覧・ルーム詳細の取得（HTTP API 用）

use std::sync::Arc;

use crate::domain::{EventId, Room, RoomRepository};

use super::error::GetRoomDetailError;

/// ルーム一覧取得のユースケース
pub struct GetRoomsUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomsUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    /// 現存するルームを作成順に返す
    pub async fn execute(&self) -> Vec<Room> {
        let mut rooms = Vec::new();
        for handle in self.repository.list().await {
            let room = handle.lock().await;
            if !room.is_closed() {
                rooms.push(room.clone());
            }
        }
        rooms.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.event_id.as_str().cmp(b.event_id.as_str()))
        });
        rooms
    }
}

/// ルーム詳細取得のユースケース
pub struct GetRoomDetailUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomDetailUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, event_id: String) -> Result<Room, GetRoomDetailError> {
        let event_id = EventId::new(event_id).map_err(|_| GetRoomDetailError::InvalidEventId)?;
        let handle = self
            .repository
            .find(&event_id)
            .await
            .ok_or(GetRoomDetailError::RoomNotFound)?;
        let room = handle.lock().await;
        if room.is_closed() {
            return Err(GetRoomDetailError::RoomNotFound);
        }
        Ok(room.clone())
    }
}
