//! Domain layer for the watch party room core.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod event;
pub mod message_pusher;
pub mod repository;
pub mod resolver;
pub mod value_object;

pub use entity::{
    ChatMessage, ConnectionSession, HostMuteOutcome, Identity, MuteState, Participant,
    ParticipantView, Room, RoomSnapshot, SelfMuteOutcome, SpeakingOutcome,
};
pub use error::{MessagePushError, ModerationError, ResolveError, ValueObjectError};
pub use event::{Delivery, NoticeKind, ServerEvent, SignalKind};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::{RoomHandle, RoomRepository};
pub use resolver::{HostResolver, IdentityResolver};
pub use value_object::{
    ChatText, ConnectionId, ConnectionIdFactory, Credential, EventId, MessageId, Timestamp,
    UserId, UserName,
};
