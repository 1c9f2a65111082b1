//! UseCase 層のエラー型

use thiserror::Error;

/// 接続時の認証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingCredential,

    #[error("Invalid session")]
    InvalidCredential,

    #[error("Authentication service unavailable")]
    ResolverUnavailable(String),
}

/// ルーム詳細取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetRoomDetailError {
    #[error("room not found")]
    RoomNotFound,

    #[error("invalid event id")]
    InvalidEventId,
}
