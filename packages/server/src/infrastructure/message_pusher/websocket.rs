//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの送信キュー（有界の `mpsc::Sender`）を管理
//! - ドメインイベントを JSON にシリアライズして送信（push_to, broadcast）
//!
//! ## バックプレッシャー
//!
//! 送信キューの表は接続 ID ごとにシャーディングされた `DashMap` で持ち、
//! 別々のルームからの送信が 1 つのロックを奪い合うことはありません。
//! 送信は `try_send` で行い、ルームのロック中に待たされることはありません。
//! キューが満杯のとき、発話状態のような間引き可能なイベントは捨て、
//! それ以外のイベントでは受信者を登録解除します。登録解除で送信キューが閉じ、
//! その接続の送信ループが終わることで、通常の切断処理に合流します。

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc::error::TrySendError;

use crate::{
    domain::{ConnectionId, Delivery, MessagePushError, MessagePusher, PusherChannel, ServerEvent},
    infrastructure::dto::websocket::ServerMessage,
};

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new();
/// let (tx, rx) = tokio::sync::mpsc::channel(256);
/// pusher.register_client(connection_id.clone(), tx).await;
/// pusher.push_to(&connection_id, &ServerEvent::kicked_from_room()).await?;
/// ```
pub struct WebSocketMessagePusher {
    /// 接続中のクライアントの送信キュー
    ///
    /// Key: connection_id
    clients: DashMap<ConnectionId, PusherChannel>,
}

impl Default for WebSocketMessagePusher {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketMessagePusher {
    /// 新しい WebSocketMessagePusher を作成
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    fn encode(event: &ServerEvent) -> Result<String, MessagePushError> {
        serde_json::to_string(&ServerMessage::from(event))
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))
    }

    /// 1 件送信する。キューが満杯の場合は配送レベルに応じて処理する。
    ///
    /// # Returns
    ///
    /// 受信者を登録解除すべき場合は `true`
    fn deliver(
        connection_id: &ConnectionId,
        sender: &PusherChannel,
        content: String,
        delivery: Delivery,
    ) -> Result<(), (MessagePushError, bool)> {
        match sender.try_send(content) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => match delivery {
                Delivery::BestEffort => {
                    tracing::debug!(
                        "Outbound queue of '{}' is full, dropping best-effort event",
                        connection_id
                    );
                    Err((MessagePushError::QueueFull(connection_id.to_string()), false))
                }
                Delivery::Reliable => {
                    tracing::warn!(
                        "Outbound queue of '{}' is full, disconnecting slow consumer",
                        connection_id
                    );
                    Err((MessagePushError::QueueFull(connection_id.to_string()), true))
                }
            },
            Err(TrySendError::Closed(_)) => Err((
                MessagePushError::PushFailed(format!("connection '{}' is closed", connection_id)),
                true,
            )),
        }
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
        self.clients.insert(connection_id, sender);
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        if self.clients.remove(connection_id).is_some() {
            tracing::debug!(
                "Connection '{}' unregistered from MessagePusher",
                connection_id
            );
        }
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &ServerEvent,
    ) -> Result<(), MessagePushError> {
        let content = Self::encode(event)?;

        // シャードの参照はこの文の終わりで解放され、その後に remove する
        let result = match self.clients.get(connection_id) {
            Some(sender) => Self::deliver(connection_id, sender.value(), content, event.delivery()),
            None => return Err(MessagePushError::ClientNotFound(connection_id.to_string())),
        };
        match result {
            Ok(()) => {
                tracing::debug!("Pushed event to connection '{}'", connection_id);
                Ok(())
            }
            Err((e, evict)) => {
                if evict {
                    self.clients.remove(connection_id);
                }
                Err(e)
            }
        }
    }

    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        event: &ServerEvent,
    ) -> Result<(), MessagePushError> {
        if targets.is_empty() {
            return Ok(());
        }
        let content = Self::encode(event)?;
        let delivery = event.delivery();

        for target in targets {
            let result = match self.clients.get(target) {
                Some(sender) => Self::deliver(target, sender.value(), content.clone(), delivery),
                None => {
                    tracing::debug!("Connection '{}' not found during broadcast, skipping", target);
                    continue;
                }
            };
            // ブロードキャストでは一部の送信失敗を許容
            if let Err((_, true)) = result {
                self.clients.remove(target);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NoticeKind;
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - push_to: 特定の接続への送信と JSON 形式
    // - broadcast: 複数接続への送信と部分失敗の許容
    // - 送信キューが満杯のときの配送レベルごとの挙動
    //
    // 【なぜこのテストが必要か】
    // - 遅いクライアントがルーム全体を止めないことを保証する
    // - 発話状態の更新が溜まり続けないことを保証する
    // ========================================

    fn connection(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    fn speaking_event() -> ServerEvent {
        use crate::domain::{Identity, Participant, Timestamp, UserId, UserName};
        let mut participant = Participant::new(
            connection("speaker"),
            &Identity::new(UserId::new(5), UserName::new("sp".to_string()).unwrap()),
            Timestamp::new(0),
        );
        participant.is_speaking = true;
        ServerEvent::speaking_updated(participant)
    }

    #[tokio::test]
    async fn test_push_to_success() {
        // テスト項目: 特定の接続にイベントが JSON で届く
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, mut rx) = mpsc::channel(8);
        pusher.register_client(connection("alice"), tx).await;

        // when (操作):
        let result = pusher
            .push_to(&connection("alice"), &ServerEvent::notice(NoticeKind::NotHost))
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        let received: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(received["event"], "moderation_notice");
        assert_eq!(received["data"]["type"], "not_host");
    }

    #[tokio::test]
    async fn test_push_to_client_not_found() {
        // テスト項目: 登録されていない接続への送信はエラーを返す
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();

        // when (操作):
        let result = pusher
            .push_to(&connection("ghost"), &ServerEvent::kicked_from_room())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(MessagePushError::ClientNotFound(_))));
    }

    #[tokio::test]
    async fn test_broadcast_partial_failure() {
        // テスト項目: 一部の接続が存在しなくてもブロードキャストは成功する
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        pusher.register_client(connection("alice"), tx1).await;
        pusher.register_client(connection("bob"), tx2).await;

        // when (操作):
        let targets = vec![connection("alice"), connection("ghost"), connection("bob")];
        let result = pusher
            .broadcast(&targets, &ServerEvent::kicked_from_room())
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert!(rx1.recv().await.unwrap().contains("kicked_from_room"));
        assert!(rx2.recv().await.unwrap().contains("kicked_from_room"));
    }

    #[tokio::test]
    async fn test_full_queue_drops_best_effort_event_but_keeps_client() {
        // テスト項目: キュー満杯時、発話状態の更新は捨てられ、接続は維持される
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, mut rx) = mpsc::channel(1);
        pusher.register_client(connection("alice"), tx).await;
        pusher
            .push_to(&connection("alice"), &speaking_event())
            .await
            .unwrap();

        // when (操作): キューが満杯の状態でもう 1 件送る
        let result = pusher.push_to(&connection("alice"), &speaking_event()).await;

        // then (期待する結果):
        assert!(matches!(result, Err(MessagePushError::QueueFull(_))));
        assert!(rx.recv().await.is_some());
        assert!(
            pusher
                .push_to(&connection("alice"), &speaking_event())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_full_queue_evicts_slow_consumer_on_reliable_event() {
        // テスト項目: キュー満杯時に確実配送のイベントを送ると受信者が登録解除され、キューが閉じる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, mut rx) = mpsc::channel(1);
        pusher.register_client(connection("slow"), tx).await;
        let targets = vec![connection("slow")];
        pusher
            .broadcast(&targets, &ServerEvent::kicked_from_room())
            .await
            .unwrap();

        // when (操作):
        pusher
            .broadcast(&targets, &ServerEvent::kicked_from_room())
            .await
            .unwrap();

        // then (期待する結果): 溜まっていた 1 件の後にキューが閉じる
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
        assert!(matches!(
            pusher
                .push_to(&connection("slow"), &ServerEvent::kicked_from_room())
                .await,
            Err(MessagePushError::ClientNotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_and_broadcast() {
        // テスト項目: 複数タスクから同時に登録・送信・登録解除しても、登録中の接続には届く
        // given (前提条件):
        let pusher = std::sync::Arc::new(WebSocketMessagePusher::new());
        let (tx, mut rx) = mpsc::channel(1024);
        pusher.register_client(connection("listener"), tx).await;

        // when (操作): 各タスクが自分の接続を登録し、listener を含めて送信して解除する
        let mut tasks = Vec::new();
        for i in 0..8 {
            let pusher = pusher.clone();
            tasks.push(tokio::spawn(async move {
                let own = connection(&format!("peer-{i}"));
                let (tx, _rx) = mpsc::channel(64);
                pusher.register_client(own.clone(), tx).await;
                let targets = vec![connection("listener"), own.clone()];
                for _ in 0..10 {
                    pusher
                        .broadcast(&targets, &ServerEvent::kicked_from_room())
                        .await
                        .unwrap();
                }
                pusher.unregister_client(&own).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // then (期待する結果): 8 タスク × 10 件がすべて listener に届き、ほかの登録は残らない
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 80);
        assert_eq!(pusher.clients.len(), 1);
    }
}
