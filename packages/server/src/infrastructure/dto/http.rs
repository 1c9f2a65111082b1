//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::ParticipantInfo;

/// `GET /api/rooms` の 1 要素
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub event_id: String,
    pub host_user_id: Option<i64>,
    pub participant_count: usize,
    /// RFC 3339 (UTC)
    pub created_at: String,
}

/// `GET /api/rooms/{event_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub event_id: String,
    pub host_user_id: Option<i64>,
    pub created_at: String,
    pub participants: Vec<ParticipantInfo>,
    pub message_count: usize,
}
