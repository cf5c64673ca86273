//! Infrastructure layer: concrete registry, durable stores, message pusher and DTOs.

pub mod dto;
pub mod message_pusher;
pub mod registry;
pub mod store;
