//! サーバからクライアントへ送るイベント（ドメイン表現）
//!
//! ワイヤ形式への変換は Infrastructure 層の DTO が担当します。

use serde_json::Value;

use super::{
    entity::{ChatMessage, Participant, ParticipantView, RoomSnapshot},
    value_object::{ConnectionId, UserId, UserName},
};

/// 本人だけに届くモデレーション通知の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    NotHost,
    HostMuted,
    MutedByHost,
    UnmutedByHost,
    Kicked,
}

impl NoticeKind {
    /// 通知に添える既定の文言
    pub fn default_message(&self) -> &'static str {
        match self {
            NoticeKind::NotHost => "Only the host can do that",
            NoticeKind::HostMuted => "You have been muted by the host and cannot unmute yourself",
            NoticeKind::MutedByHost => "You have been muted by the host",
            NoticeKind::UnmutedByHost => "The host has allowed you to unmute yourself",
            NoticeKind::Kicked => "You have been removed from the party by the host",
        }
    }
}

/// 配送の保証レベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// 送信キューが溢れたら受信者を切断する
    Reliable,
    /// 送信キューが溢れたら捨ててよい
    BestEffort,
}

/// WebRTC シグナリングの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

/// サーバが送信するイベント
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    AuthError {
        message: String,
    },
    RoomState(RoomSnapshot),
    UserJoined {
        participant: ParticipantView,
        participant_count: usize,
    },
    UserLeft {
        participant: Participant,
        participant_count: usize,
        was_kicked: bool,
    },
    ChatMessage(ChatMessage),
    ParticipantUpdated {
        participant: Participant,
        /// 発話状態の更新（高頻度・間引き可）
        speaking_only: bool,
    },
    ModerationNotice {
        kind: NoticeKind,
        message: String,
    },
    KickedFromRoom {
        message: String,
    },
    Signal {
        kind: SignalKind,
        from_connection_id: ConnectionId,
        from_user_id: UserId,
        from_user_name: UserName,
        payload: Value,
    },
}

impl ServerEvent {
    pub const KICKED_FROM_ROOM_MESSAGE: &'static str =
        "You have been removed from this watch party. Please leave the room.";

    pub fn notice(kind: NoticeKind) -> Self {
        ServerEvent::ModerationNotice {
            kind,
            message: kind.default_message().to_string(),
        }
    }

    pub fn kicked_from_room() -> Self {
        ServerEvent::KickedFromRoom {
            message: Self::KICKED_FROM_ROOM_MESSAGE.to_string(),
        }
    }

    pub fn participant_updated(participant: Participant) -> Self {
        ServerEvent::ParticipantUpdated {
            participant,
            speaking_only: false,
        }
    }

    pub fn speaking_updated(participant: Participant) -> Self {
        ServerEvent::ParticipantUpdated {
            participant,
            speaking_only: true,
        }
    }

    pub fn delivery(&self) -> Delivery {
        match self {
            ServerEvent::ParticipantUpdated {
                speaking_only: true,
                ..
            } => Delivery::BestEffort,
            _ => Delivery::Reliable,
        }
    }
}

/// システムメッセージの文言
pub mod system_text {
    pub fn joined(user_name: &str) -> String {
        format!("{user_name} joined the party")
    }

    pub fn left(user_name: &str) -> String {
        format!("{user_name} left the party")
    }

    pub fn muted_by_host(user_name: &str) -> String {
        format!("{user_name} was muted by the host")
    }

    pub fn unmuted_by_host(user_name: &str) -> String {
        format!("{user_name} was unmuted by the host")
    }

    pub fn kicked(user_name: &str) -> String {
        format!("{user_name} was removed from the party by the host")
    }

    pub const MUTED_ALL: &str = "Host muted all participants";
}
