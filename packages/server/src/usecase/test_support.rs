//! UseCase テスト用のフィクスチャ
//!
//! 実際の InMemoryRoomRepository と WebSocketMessagePusher を組み合わせ、
//! 各接続の送信キューを直接読んでイベントを検証します。

use std::sync::Arc;

use nagaya_shared::time::{Clock, FixedClock};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    domain::{
        ConnectionIdFactory, ConnectionSession, EventId, HostResolver, Identity, MessagePusher,
        RoomHandle, RoomRepository, UserId, UserName,
    },
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository,
        resolver::StaticDirectory,
    },
};

use super::{
    GetRoomDetailUseCase, GetRoomsUseCase, JoinRoomUseCase, LeaveRoomUseCase, ModerationUseCase,
    RelaySignalUseCase, SendChatMessageUseCase, SetSpeakingUseCase, ToggleMuteUseCase,
};

/// イベント "42" のホストは user 1
const DIRECTORY: &str = r#"{"events": [{"eventId": "42", "hostUserId": 1}]}"#;

pub fn event(id: &str) -> EventId {
    EventId::new(id.to_string()).unwrap()
}

pub struct Fixture {
    pub repository: Arc<dyn RoomRepository>,
    pub message_pusher: Arc<dyn MessagePusher>,
    pub join: JoinRoomUseCase,
    pub leave: Arc<LeaveRoomUseCase>,
    pub send_chat: SendChatMessageUseCase,
    pub toggle_mute: ToggleMuteUseCase,
    pub set_speaking: SetSpeakingUseCase,
    pub moderation: ModerationUseCase,
    pub relay: RelaySignalUseCase,
    pub get_rooms: GetRoomsUseCase,
    pub get_room_detail: GetRoomDetailUseCase,
}

impl Fixture {
    pub const NOW: i64 = 1_700_000_000_000;

    pub fn new() -> Self {
        let directory = StaticDirectory::from_json(DIRECTORY).unwrap();
        Self::with_host_resolver(Arc::new(directory))
    }

    pub fn with_host_resolver(host_resolver: Arc<dyn HostResolver>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(Self::NOW));
        Self::with_parts(Arc::new(InMemoryRoomRepository::new(clock)), host_resolver)
    }

    pub fn with_parts(
        repository: Arc<dyn RoomRepository>,
        host_resolver: Arc<dyn HostResolver>,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(Self::NOW));
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());
        let leave = Arc::new(LeaveRoomUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            clock.clone(),
        ));

        Self {
            join: JoinRoomUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                host_resolver,
                leave.clone(),
                clock.clone(),
            ),
            leave,
            send_chat: SendChatMessageUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            toggle_mute: ToggleMuteUseCase::new(repository.clone(), message_pusher.clone()),
            set_speaking: SetSpeakingUseCase::new(repository.clone(), message_pusher.clone()),
            moderation: ModerationUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                clock,
            ),
            relay: RelaySignalUseCase::new(message_pusher.clone()),
            get_rooms: GetRoomsUseCase::new(repository.clone()),
            get_room_detail: GetRoomDetailUseCase::new(repository.clone()),
            repository,
            message_pusher,
        }
    }

    /// 認証済みの接続を 1 本作り、送信キューを登録する
    pub async fn connect(&self, user_id: i64, user_name: &str) -> TestClient {
        let identity = Identity::new(
            UserId::new(user_id),
            UserName::new(user_name.to_string()).unwrap(),
        );
        let session = ConnectionSession::new(ConnectionIdFactory::generate(), identity);
        let (tx, rx) = mpsc::channel(256);
        self.message_pusher
            .register_client(session.connection_id.clone(), tx)
            .await;
        TestClient { session, rx }
    }

    pub async fn room(&self, id: &str) -> Option<RoomHandle> {
        self.repository.find(&event(id)).await
    }

    /// 最初に見つかった `name` イベントの `data`
    pub fn find<'a>(events: &'a [Value], name: &str) -> Option<&'a Value> {
        events
            .iter()
            .find(|envelope| envelope["event"] == name)
            .map(|envelope| &envelope["data"])
    }
}

pub struct TestClient {
    pub session: ConnectionSession,
    rx: mpsc::Receiver<String>,
}

impl TestClient {
    /// 受信済みのイベント（`{"event", "data"}` 形式）をすべて取り出す
    pub fn drain(&mut self) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(json) = self.rx.try_recv() {
            events.push(serde_json::from_str(&json).unwrap());
        }
        events
    }

    /// 受信済みのイベントをすべて取り出し、`name` イベントの `data` を返す
    pub fn expect_event(&mut self, name: &str) -> Value {
        let events = self.drain();
        match Fixture::find(&events, name) {
            Some(data) => data.clone(),
            None => panic!("expected '{name}' event, got {events:?}"),
        }
    }
}
