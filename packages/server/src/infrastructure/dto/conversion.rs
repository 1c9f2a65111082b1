//! Conversion logic between DTOs and domain entities.

use nagaya_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    ChatMessage, NoticeKind, ParticipantView, Room, RoomSnapshot, ServerEvent, SignalKind,
};
use crate::infrastructure::dto::{
    http::{RoomDetailDto, RoomSummaryDto},
    websocket as dto,
};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&ParticipantView> for dto::ParticipantInfo {
    fn from(view: &ParticipantView) -> Self {
        let p = &view.participant;
        Self {
            connection_id: p.connection_id.as_str().to_string(),
            user_id: p.user_id.value(),
            user_name: p.user_name.as_str().to_string(),
            is_muted: p.is_muted(),
            is_speaking: p.is_speaking,
            is_host_muted: p.is_host_muted(),
            joined_at: p.joined_at.value(),
            is_host: view.is_host,
        }
    }
}

impl From<&ChatMessage> for dto::ChatMessageInfo {
    fn from(model: &ChatMessage) -> Self {
        Self {
            id: model.id.as_str().to_string(),
            user_id: model.user_id.value(),
            user_name: model.user_name.as_str().to_string(),
            text: model.text.clone(),
            timestamp: model.timestamp.value(),
            is_system: model.is_system,
        }
    }
}

impl From<NoticeKind> for dto::NoticeType {
    fn from(kind: NoticeKind) -> Self {
        match kind {
            NoticeKind::NotHost => Self::NotHost,
            NoticeKind::HostMuted => Self::HostMuted,
            NoticeKind::MutedByHost => Self::MutedByHost,
            NoticeKind::UnmutedByHost => Self::UnmutedByHost,
            NoticeKind::Kicked => Self::Kicked,
        }
    }
}

impl From<&RoomSnapshot> for dto::ServerMessage {
    fn from(snapshot: &RoomSnapshot) -> Self {
        Self::RoomState {
            participants: snapshot.participants.iter().map(Into::into).collect(),
            chat_history: snapshot.chat_history.iter().map(Into::into).collect(),
            host_user_id: snapshot.host_user_id.map(|id| id.value()),
            my_user_id: snapshot.my_user_id.value(),
        }
    }
}

impl From<&ServerEvent> for dto::ServerMessage {
    fn from(event: &ServerEvent) -> Self {
        match event {
            ServerEvent::AuthError { message } => Self::AuthError {
                message: message.clone(),
            },
            ServerEvent::RoomState(snapshot) => snapshot.into(),
            ServerEvent::UserJoined {
                participant,
                participant_count,
            } => Self::UserJoined {
                participant: participant.into(),
                participant_count: *participant_count,
            },
            ServerEvent::UserLeft {
                participant,
                participant_count,
                was_kicked,
            } => Self::UserLeft {
                connection_id: participant.connection_id.as_str().to_string(),
                user_id: participant.user_id.value(),
                user_name: participant.user_name.as_str().to_string(),
                participant_count: *participant_count,
                was_kicked: was_kicked.then_some(true),
            },
            ServerEvent::ChatMessage(message) => Self::ChatMessage(message.into()),
            ServerEvent::ParticipantUpdated { participant, .. } => Self::ParticipantUpdated {
                connection_id: participant.connection_id.as_str().to_string(),
                is_muted: participant.is_muted(),
                is_speaking: participant.is_speaking,
                is_host_muted: participant.is_host_muted(),
            },
            ServerEvent::ModerationNotice { kind, message } => Self::ModerationNotice {
                notice_type: (*kind).into(),
                message: message.clone(),
            },
            ServerEvent::KickedFromRoom { message } => Self::KickedFromRoom {
                message: message.clone(),
            },
            ServerEvent::Signal {
                kind,
                from_connection_id,
                from_user_id,
                from_user_name,
                payload,
            } => {
                let from_connection_id = from_connection_id.as_str().to_string();
                match kind {
                    SignalKind::Offer => Self::WebrtcOffer {
                        from_connection_id,
                        from_user_id: from_user_id.value(),
                        from_user_name: from_user_name.as_str().to_string(),
                        offer: payload.clone(),
                    },
                    SignalKind::Answer => Self::WebrtcAnswer {
                        from_connection_id,
                        answer: payload.clone(),
                    },
                    SignalKind::IceCandidate => Self::WebrtcIceCandidate {
                        from_connection_id,
                        candidate: payload.clone(),
                    },
                }
            }
        }
    }
}

impl From<&Room> for RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            event_id: room.event_id.as_str().to_string(),
            host_user_id: room.host_user_id().map(|id| id.value()),
            participant_count: room.participant_count(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}

impl From<&Room> for RoomDetailDto {
    fn from(room: &Room) -> Self {
        Self {
            event_id: room.event_id.as_str().to_string(),
            host_user_id: room.host_user_id().map(|id| id.value()),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
            participants: room
                .participants()
                .into_iter()
                .map(|p| (&room.view(p)).into())
                .collect(),
            message_count: room.message_count(),
        }
    }
}
