//! Entities
//!
//! `Room` は参加者の集合と直近メッセージのキャッシュを保持する、ライブ状態の集約。
//! `RoomRecord` / `NewMessage` は永続ストア側の事実を表す。

use std::collections::VecDeque;

use super::{
    error::RoomError,
    value_object::{ConnectionId, DisplayName, MessageContent, MessageId, RoomId, Timestamp},
};

/// One live connection inside one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub name: DisplayName,
    pub last_activity: Timestamp,
}

impl Participant {
    pub fn new(connection_id: ConnectionId, name: DisplayName, joined_at: Timestamp) -> Self {
        Self {
            connection_id,
            name,
            last_activity: joined_at,
        }
    }
}

/// A chat message as broadcast and replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// `None` only for messages that never went through the durable store
    pub id: Option<MessageId>,
    pub author: DisplayName,
    pub content: MessageContent,
    pub timestamp: Timestamp,
}

/// A message about to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub author: DisplayName,
    pub content: MessageContent,
    pub timestamp: Timestamp,
}

/// Durable room metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    pub id: RoomId,
    pub created_at: Timestamp,
    pub last_activity: Timestamp,
}

/// Durable room metadata merged with the live participant count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub record: RoomRecord,
    pub participant_count: usize,
}

/// Live state of one room.
///
/// Participants are kept in join order. The message cache holds at most
/// `message_capacity` entries and drops the oldest first.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    participants: Vec<Participant>,
    recent_messages: VecDeque<ChatMessage>,
    message_capacity: usize,
    last_activity: Timestamp,
    closed: bool,
}

impl Room {
    pub fn new(id: RoomId, created_at: Timestamp, message_capacity: usize) -> Self {
        Self {
            id,
            participants: Vec::new(),
            recent_messages: VecDeque::with_capacity(message_capacity),
            message_capacity,
            last_activity: created_at,
            closed: false,
        }
    }

    pub fn add_participant(&mut self, participant: Participant) -> Result<(), RoomError> {
        if self.closed {
            return Err(RoomError::RoomClosed(self.id.to_string()));
        }
        if self.participant(&participant.connection_id).is_some() {
            return Err(RoomError::DuplicateParticipant(
                participant.connection_id.to_string(),
            ));
        }
        self.last_activity = participant.last_activity;
        self.participants.push(participant);
        Ok(())
    }

    pub fn remove_participant(&mut self, connection_id: &ConnectionId) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| &p.connection_id == connection_id)?;
        Some(self.participants.remove(index))
    }

    pub fn participant(&self, connection_id: &ConnectionId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| &p.connection_id == connection_id)
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participant_names(&self) -> Vec<DisplayName> {
        self.participants.iter().map(|p| p.name.clone()).collect()
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.participants.iter().map(|p| p.connection_id).collect()
    }

    pub fn connection_ids_except(&self, exclude: &ConnectionId) -> Vec<ConnectionId> {
        self.participants
            .iter()
            .map(|p| p.connection_id)
            .filter(|id| id != exclude)
            .collect()
    }

    /// Append to the cache, evicting the oldest entry past the bound.
    pub fn push_message(&mut self, message: ChatMessage) {
        if self.message_capacity == 0 {
            return;
        }
        while self.recent_messages.len() >= self.message_capacity {
            self.recent_messages.pop_front();
        }
        self.recent_messages.push_back(message);
    }

    /// Fill an empty cache from replayed history; a warm cache is left untouched.
    pub fn seed_messages(&mut self, history: Vec<ChatMessage>) {
        if !self.recent_messages.is_empty() {
            return;
        }
        for message in history {
            self.push_message(message);
        }
    }

    pub fn recent_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.recent_messages.iter()
    }

    /// Record activity for the room and, if given, for one participant.
    pub fn touch(&mut self, connection_id: Option<&ConnectionId>, now: Timestamp) {
        self.last_activity = now;
        if let Some(connection_id) = connection_id {
            if let Some(participant) = self
                .participants
                .iter_mut()
                .find(|p| &p.connection_id == connection_id)
            {
                participant.last_activity = now;
            }
        }
    }

    pub fn last_activity(&self) -> Timestamp {
        self.last_activity
    }

    /// Mark the room closed and hand back everyone who was still inside.
    pub fn close(&mut self) -> Vec<Participant> {
        self.closed = true;
        std::mem::take(&mut self.participants)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
