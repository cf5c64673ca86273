//! Value Objects
//!
//! 不変で、値によって同一性が決まるドメインの基本型。
//! 生成時にバリデーションを行い、不正な値を持つインスタンスは作られない。

use std::fmt;

use uuid::Uuid;

use super::error::ValueObjectError;

/// Number of characters in a room code.
pub const ROOM_CODE_LENGTH: usize = 6;

/// Upper bound on the length of a chat message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 500;

/// Short alphanumeric room code, e.g. `AB12CD`.
///
/// Codes typed by users are normalised (trimmed and upper-cased) before validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueObjectError> {
        let normalized = value.into().trim().to_ascii_uppercase();
        if normalized.len() != ROOM_CODE_LENGTH
            || !normalized
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(ValueObjectError::InvalidRoomId(normalized));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one live WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Anonymous display name assigned on join, e.g. `Guest_Swift_Wolf`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated chat message text.
///
/// The raw input must not exceed [`MAX_MESSAGE_LENGTH`] characters and must not be
/// blank; the stored value is trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValueObjectError> {
        let raw = raw.as_ref();
        let length = raw.chars().count();
        if length > MAX_MESSAGE_LENGTH {
            return Err(ValueObjectError::MessageTooLong {
                length,
                max: MAX_MESSAGE_LENGTH,
            });
        }
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::EmptyMessage);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Identifier assigned to a message by the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Unix timestamp in UTC milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Instant `millis` milliseconds before this one.
    pub fn minus_millis(&self, millis: i64) -> Self {
        Self(self.0.saturating_sub(millis))
    }
}
