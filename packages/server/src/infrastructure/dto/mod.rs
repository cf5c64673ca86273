//! Data Transfer Objects (DTOs) for the wire protocol.
//!
//! - `websocket`: event frames and payloads exchanged over the WebSocket
//! - `conversion`: domain entity → DTO conversions

pub mod conversion;
pub mod websocket;
