//! Shared application state.

use std::sync::Arc;

use nagaya_shared::time::Clock;

use crate::{
    domain::{HostResolver, IdentityResolver, MessagePusher, RoomRepository},
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository,
    },
    usecase::{
        AuthenticateUseCase, GetRoomDetailUseCase, GetRoomsUseCase, JoinRoomUseCase,
        LeaveRoomUseCase, ModerationUseCase, RelaySignalUseCase, SendChatMessageUseCase,
        SetSpeakingUseCase, ToggleMuteUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// AuthenticateUseCase（接続認証のユースケース）
    pub authenticate_usecase: Arc<AuthenticateUseCase>,
    /// JoinRoomUseCase（ルーム参加のユースケース）
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// LeaveRoomUseCase（ルーム退出・切断のユースケース）
    pub leave_room_usecase: Arc<LeaveRoomUseCase>,
    /// SendChatMessageUseCase（チャット送信のユースケース）
    pub send_chat_message_usecase: Arc<SendChatMessageUseCase>,
    /// ToggleMuteUseCase（ミュート切り替えのユースケース）
    pub toggle_mute_usecase: Arc<ToggleMuteUseCase>,
    /// SetSpeakingUseCase（発話状態更新のユースケース）
    pub set_speaking_usecase: Arc<SetSpeakingUseCase>,
    /// ModerationUseCase（ホストによるモデレーション）
    pub moderation_usecase: Arc<ModerationUseCase>,
    /// RelaySignalUseCase（シグナリング中継のユースケース）
    pub relay_signal_usecase: Arc<RelaySignalUseCase>,
    /// GetRoomsUseCase（ルーム一覧取得のユースケース）
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// GetRoomDetailUseCase（ルーム詳細取得のユースケース）
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
    /// MessagePusher（接続ごとの送信キューの登録先）
    pub message_pusher: Arc<dyn MessagePusher>,
    /// 接続ごとの送信キューの容量
    pub outbound_buffer: usize,
}

impl AppState {
    /// Repository・MessagePusher・UseCase を組み立てる
    ///
    /// Initialize dependencies in order:
    /// 1. Repository
    /// 2. MessagePusher
    /// 3. UseCases
    pub fn build(
        identity_resolver: Arc<dyn IdentityResolver>,
        host_resolver: Arc<dyn HostResolver>,
        clock: Arc<dyn Clock>,
        outbound_buffer: usize,
    ) -> Self {
        // 1. Create Repository (in-memory room registry)
        let repository: Arc<dyn RoomRepository> =
            Arc::new(InMemoryRoomRepository::new(clock.clone()));

        // 2. Create MessagePusher (WebSocket implementation)
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());

        // 3. Create UseCases
        let leave_room_usecase = Arc::new(LeaveRoomUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            clock.clone(),
        ));
        Self {
            authenticate_usecase: Arc::new(AuthenticateUseCase::new(identity_resolver)),
            join_room_usecase: Arc::new(JoinRoomUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                host_resolver,
                leave_room_usecase.clone(),
                clock.clone(),
            )),
            leave_room_usecase,
            send_chat_message_usecase: Arc::new(SendChatMessageUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            toggle_mute_usecase: Arc::new(ToggleMuteUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            set_speaking_usecase: Arc::new(SetSpeakingUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            moderation_usecase: Arc::new(ModerationUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                clock,
            )),
            relay_signal_usecase: Arc::new(RelaySignalUseCase::new(message_pusher.clone())),
            get_rooms_usecase: Arc::new(GetRoomsUseCase::new(repository.clone())),
            get_room_detail_usecase: Arc::new(GetRoomDetailUseCase::new(repository)),
            message_pusher,
            outbound_buffer,
        }
    }
}
