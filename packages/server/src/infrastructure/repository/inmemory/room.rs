//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! DashMap をインメモリのルームレジストリとして使用します。
//!
//! レジストリが持つのは「イベント ID → ルームのロック」の対応だけで、
//! ルームの中身はルームごとの Mutex で保護されます。
//! そのため、無関係なルーム同士が互いを待つことはありません。

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use nagaya_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{EventId, Room, RoomHandle, RoomRepository, Timestamp};

/// インメモリ Room Repository 実装
pub struct InMemoryRoomRepository {
    /// Key: event_id, Value: ルームのロック
    rooms: DashMap<EventId, RoomHandle>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: DashMap::new(),
            clock,
        }
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn get_or_create(&self, event_id: &EventId) -> RoomHandle {
        self.rooms
            .entry(event_id.clone())
            .or_insert_with(|| {
                tracing::info!("Room for event '{}' created", event_id);
                Arc::new(Mutex::new(Room::new(
                    event_id.clone(),
                    Timestamp::new(self.clock.now_millis()),
                )))
            })
            .clone()
    }

    async fn find(&self, event_id: &EventId) -> Option<RoomHandle> {
        self.rooms.get(event_id).map(|entry| entry.value().clone())
    }

    async fn remove_if_current(&self, event_id: &EventId, handle: &RoomHandle) -> bool {
        let removed = self
            .rooms
            .remove_if(event_id, |_, current| Arc::ptr_eq(current, handle))
            .is_some();
        if removed {
            tracing::info!("Room for event '{}' destroyed", event_id);
        }
        removed
    }

    async fn list(&self) -> Vec<RoomHandle> {
        self.rooms.iter().map(|entry| entry.value().clone()).collect()
    }
}
