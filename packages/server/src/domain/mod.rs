//! Domain layer: value objects, entities, identifier generation, rate limiting
//! and the interfaces the outer layers implement.

pub mod entity;
pub mod error;
pub mod factory;
pub mod message_pusher;
pub mod rate_limit;
pub mod repository;
pub mod value_object;

pub use entity::{ChatMessage, NewMessage, Participant, Room, RoomRecord, RoomSummary};
pub use error::{MessagePushError, RoomError, StoreError, ValueObjectError};
pub use factory::{IdentifierGenerator, RandomIdentifierGenerator};
pub use message_pusher::{MessagePusher, PushFrame, PusherChannel};
pub use rate_limit::{RateLimitPolicy, RateLimitWindow, RateLimiter};
pub use repository::{Departure, JoinedRoom, RoomRegistry, RoomStore};
pub use value_object::{
    ConnectionId, DisplayName, MAX_MESSAGE_LENGTH, MessageContent, MessageId, ROOM_CODE_LENGTH,
    RoomId, Timestamp,
};
