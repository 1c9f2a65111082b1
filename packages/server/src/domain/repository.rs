//! Repository trait 定義
//!
//! ドメイン層が必要とするルームレジストリのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{entity::Room, value_object::EventId};

/// ルームごとのロック
///
/// 1 ルームに対する変更はすべてこのロックの中で直列化される。
pub type RoomHandle = Arc<Mutex<Room>>;

/// Room Repository trait（ルームレジストリ）
///
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
/// ルーム単位のロックを払い出すだけで、レジストリ全体を長時間ロックすることはない。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// イベント ID に対応するルームを取得し、なければ作成する
    async fn get_or_create(&self, event_id: &EventId) -> RoomHandle;

    /// イベント ID に対応するルームを取得
    async fn find(&self, event_id: &EventId) -> Option<RoomHandle>;

    /// レジストリ上のルームが `handle` と同一の場合に限り削除する
    ///
    /// 削除された場合は `true`
    async fn remove_if_current(&self, event_id: &EventId, handle: &RoomHandle) -> bool;

    /// 現存する全ルーム
    async fn list(&self) -> Vec<RoomHandle>;
}
