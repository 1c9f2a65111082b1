//! WebSocket event DTOs.
//!
//! Every frame is a JSON envelope `{"event": "<name>", "data": {...}}`.
//! Field names inside `data` are camelCase.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → server events
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinRoom {
        #[serde(rename = "eventId", deserialize_with = "string_or_number")]
        event_id: String,
    },
    #[serde(deserialize_with = "empty_payload")]
    LeaveRoom,
    ChatMessage {
        text: String,
    },
    ToggleMute {
        #[serde(rename = "isMuted")]
        is_muted: bool,
    },
    SpeakingState {
        #[serde(rename = "isSpeaking")]
        is_speaking: bool,
    },
    HostMuteUser {
        #[serde(rename = "targetUserId")]
        target_user_id: i64,
    },
    HostUnmuteUser {
        #[serde(rename = "targetUserId")]
        target_user_id: i64,
    },
    HostKickUser {
        #[serde(rename = "targetUserId")]
        target_user_id: i64,
    },
    #[serde(deserialize_with = "empty_payload")]
    HostMuteAll,
    WebrtcOffer {
        #[serde(rename = "targetConnectionId")]
        target_connection_id: String,
        offer: Value,
    },
    WebrtcAnswer {
        #[serde(rename = "targetConnectionId")]
        target_connection_id: String,
        answer: Value,
    },
    WebrtcIceCandidate {
        #[serde(rename = "targetConnectionId")]
        target_connection_id: String,
        candidate: Value,
    },
}

/// イベント ID は数値で送ってくるクライアントもいるため両方受け付ける
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

/// Events without a payload ignore whatever `data` carries (`{}`, `null` or nothing).
fn empty_payload<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<serde::de::IgnoredAny>::deserialize(deserializer).map(|_| ())
}

/// Participant record sent in `room_state` and `user_joined`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub connection_id: String,
    pub user_id: i64,
    pub user_name: String,
    pub is_muted: bool,
    pub is_speaking: bool,
    pub is_host_muted: bool,
    pub joined_at: i64,
    pub is_host: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageInfo {
    pub id: String,
    pub user_id: i64,
    pub user_name: String,
    pub text: String,
    /// Unix milliseconds
    pub timestamp: i64,
    pub is_system: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeType {
    NotHost,
    HostMuted,
    MutedByHost,
    UnmutedByHost,
    Kicked,
}

/// Server → client events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    AuthError {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    RoomState {
        participants: Vec<ParticipantInfo>,
        chat_history: Vec<ChatMessageInfo>,
        host_user_id: Option<i64>,
        my_user_id: i64,
    },
    #[serde(rename_all = "camelCase")]
    UserJoined {
        participant: ParticipantInfo,
        participant_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    UserLeft {
        connection_id: String,
        user_id: i64,
        user_name: String,
        participant_count: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        was_kicked: Option<bool>,
    },
    ChatMessage(ChatMessageInfo),
    #[serde(rename_all = "camelCase")]
    ParticipantUpdated {
        connection_id: String,
        is_muted: bool,
        is_speaking: bool,
        is_host_muted: bool,
    },
    ModerationNotice {
        #[serde(rename = "type")]
        notice_type: NoticeType,
        message: String,
    },
    KickedFromRoom {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    WebrtcOffer {
        from_connection_id: String,
        from_user_id: i64,
        from_user_name: String,
        offer: Value,
    },
    #[serde(rename_all = "camelCase")]
    WebrtcAnswer {
        from_connection_id: String,
        answer: Value,
    },
    #[serde(rename_all = "camelCase")]
    WebrtcIceCandidate {
        from_connection_id: String,
        candidate: Value,
    },
}
