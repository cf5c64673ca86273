//! UseCase layer: one use case per chat operation, plus the Persistence Bridge.

pub mod admin;
pub mod create_room;
pub mod disconnect_participant;
pub mod error;
pub mod join_room;
pub mod persistence;
pub mod send_message;
pub mod sweep_expired_rooms;
pub mod typing;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin::{AdminSessions, AdminUseCase, RoomDeletion};
pub use create_room::CreateRoomUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::ChatError;
pub use join_room::{JoinFailure, JoinOutcome, JoinRoomUseCase};
pub use persistence::{MAX_ROOM_CODE_ATTEMPTS, PersistenceBridge};
pub use send_message::{Delivery, SendMessageUseCase};
pub use sweep_expired_rooms::{SweepExpiredRoomsUseCase, SweepReport};
pub use typing::{TypingNotice, TypingUseCase};
