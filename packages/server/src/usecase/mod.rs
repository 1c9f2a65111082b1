//! UseCase layer: application operations on watch party rooms.
//!
//! Each use case depends only on the domain traits (`RoomRepository`,
//! `MessagePusher`, resolvers) and is wired up in `bin/server.rs`.

pub mod authenticate;
pub mod error;
pub mod get_rooms;
pub mod join_room;
pub mod leave_room;
pub mod moderation;
pub mod relay_signal;
mod room_access;
pub mod send_chat_message;
pub mod set_speaking;
pub mod toggle_mute;

#[cfg(test)]
pub(crate) mod test_support;

pub use authenticate::AuthenticateUseCase;
pub use error::{AuthError, GetRoomDetailError};
pub use get_rooms::{GetRoomDetailUseCase, GetRoomsUseCase};
pub use join_room::JoinRoomUseCase;
pub use leave_room::LeaveRoomUseCase;
pub use moderation::ModerationUseCase;
pub use relay_signal::RelaySignalUseCase;
pub use send_chat_message::SendChatMessageUseCase;
pub use set_speaking::SetSpeakingUseCase;
pub use toggle_mute::ToggleMuteUseCase;
