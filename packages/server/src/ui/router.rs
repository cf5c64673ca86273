//! Event Router
//!
//! One router per WebSocket connection. It decodes inbound frames, runs the
//! matching use case and fans the outcome out through the MessagePusher:
//! acknowledgements go back to the caller, room events to the room's
//! participants and admin events to authenticated admin connections.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    domain::{ConnectionId, Departure, MessagePusher, PusherChannel, RoomId},
    infrastructure::dto::{
        conversion::display_names,
        websocket::{
            ActiveRoomsListPayload, AdminAuthenticatedPayload, AdminLoginRequest, CreateRoomAck,
            DeleteRoomRequest, HistoryEntry, InboundFrame, JoinRoomAck, JoinRoomRequest,
            ListRoomsAck, NewMessagePayload, NoticePayload, OutboundFrame, PresencePayload,
            RoomCreatedAdminPayload, RoomDeletedAdminPayload, RoomSummaryDto, SendMessageRequest,
            StatusAck, TypingIndicatorPayload, TypingRequest, event,
        },
    },
    usecase::ChatError,
};

use super::state::AppState;

/// Encode a push frame, logging (and dropping) it if serialization fails
pub(crate) fn encode_push<T: Serialize>(event_name: &str, data: T) -> Option<String> {
    match OutboundFrame::push(event_name, data).to_json() {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to encode '{}' frame: {}", event_name, e);
            None
        }
    }
}

/// Push one event to several connections
pub(crate) async fn broadcast_event<T: Serialize>(
    pusher: &dyn MessagePusher,
    targets: &[ConnectionId],
    event_name: &str,
    data: T,
) {
    if targets.is_empty() {
        return;
    }
    let Some(json) = encode_push(event_name, data) else {
        return;
    };
    if let Err(e) = pusher.broadcast(targets, &json).await {
        tracing::warn!("Failed to broadcast '{}': {}", event_name, e);
    }
}

/// Per-connection event dispatcher
pub struct EventRouter {
    state: Arc<AppState>,
    connection_id: ConnectionId,
}

impl EventRouter {
    pub fn new(state: Arc<AppState>, connection_id: ConnectionId) -> Self {
        Self {
            state,
            connection_id,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Register the connection's outbound channel
    pub async fn connect(&self, sender: PusherChannel) {
        self.state
            .message_pusher
            .register_client(self.connection_id, sender)
            .await;
        self.state.rate_limiter.register(self.connection_id).await;
    }

    /// Clear every piece of per-connection state and leave the current room
    pub async fn disconnect(&self) {
        let Some(departure) = self
            .state
            .disconnect_participant_usecase
            .execute(self.connection_id)
            .await
        else {
            return;
        };
        self.announce_departure(&departure).await;
    }

    /// Handle one text frame from the client
    pub async fn dispatch(&self, text: &str) {
        let frame: InboundFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Malformed frame from {}: {}", self.connection_id, e);
                return;
            }
        };
        tracing::debug!("{} -> '{}'", self.connection_id, frame.event);

        match frame.event.as_str() {
            event::CREATE_ROOM => self.create_room(frame.ack).await,
            event::JOIN_ROOM => {
                if let Some(request) = self.decode::<JoinRoomRequest>(&frame).await {
                    self.join_room(frame.ack, request).await;
                }
            }
            event::SEND_MESSAGE => {
                if let Some(request) = self.decode::<SendMessageRequest>(&frame).await {
                    self.send_message(frame.ack, request).await;
                }
            }
            event::TYPING => {
                if let Some(request) = self.decode::<TypingRequest>(&frame).await {
                    self.typing(frame.ack, request).await;
                }
            }
            event::ADMIN_LOGIN => {
                if let Some(request) = self.decode::<AdminLoginRequest>(&frame).await {
                    self.admin_login(frame.ack, request).await;
                }
            }
            event::LIST_ROOMS => self.list_rooms(frame.ack).await,
            event::DELETE_ROOM => {
                if let Some(request) = self.decode::<DeleteRoomRequest>(&frame).await {
                    self.delete_room(frame.ack, request).await;
                }
            }
            other => {
                tracing::warn!("Unknown event '{}' from {}", other, self.connection_id);
                self.reply(other, frame.ack, StatusAck::failed("Unknown event."))
                    .await;
            }
        }
    }

    // ========================================
    // Event handlers
    // ========================================

    async fn create_room(&self, ack: Option<u64>) {
        match self.state.create_room_usecase.execute().await {
            Ok(room_id) => {
                self.reply(
                    event::CREATE_ROOM,
                    ack,
                    CreateRoomAck {
                        success: true,
                        room_id: room_id.as_str().to_string(),
                    },
                )
                .await;
                let admins = self.state.admin_sessions.all().await;
                broadcast_event(
                    self.state.message_pusher.as_ref(),
                    &admins,
                    event::ROOM_CREATED_ADMIN_NOTIFY,
                    RoomCreatedAdminPayload {
                        room_id: room_id.into_string(),
                    },
                )
                .await;
            }
            Err(e) => self.fail(event::CREATE_ROOM, ack, &e).await,
        }
    }

    async fn join_room(&self, ack: Option<u64>, request: JoinRoomRequest) {
        let outcome = match self
            .state
            .join_room_usecase
            .execute(self.connection_id, &request.room_id)
            .await
        {
            Ok(outcome) => outcome,
            Err(failure) => {
                if let Some(left) = &failure.left {
                    self.announce_departure(left).await;
                }
                return self.fail(event::JOIN_ROOM, ack, &failure.error).await;
            }
        };

        if let Some(left) = &outcome.left {
            self.announce_departure(left).await;
        }

        let active_users = display_names(&outcome.active_users);
        broadcast_event(
            self.state.message_pusher.as_ref(),
            &outcome.notify,
            event::USER_JOINED,
            PresencePayload {
                username: outcome.username.as_str().to_string(),
                active_users: active_users.clone(),
            },
        )
        .await;

        self.reply(
            event::JOIN_ROOM,
            ack,
            JoinRoomAck {
                success: true,
                username: outcome.username.into_string(),
                messages: outcome.messages.iter().map(HistoryEntry::from).collect(),
                active_users,
            },
        )
        .await;
    }

    async fn send_message(&self, ack: Option<u64>, request: SendMessageRequest) {
        let result = self
            .state
            .send_message_usecase
            .execute(self.connection_id, &request.room_id, &request.message)
            .await;

        match result {
            Ok(Some(delivery)) => {
                broadcast_event(
                    self.state.message_pusher.as_ref(),
                    &delivery.targets,
                    event::NEW_MESSAGE,
                    NewMessagePayload::from(&delivery.message),
                )
                .await;
                self.reply(event::SEND_MESSAGE, ack, StatusAck::ok()).await;
            }
            Ok(None) => {
                self.reply(event::SEND_MESSAGE, ack, StatusAck::ok()).await;
            }
            Err(e) => {
                let notice = match e {
                    ChatError::RateLimited => event::RATE_LIMIT_EXCEEDED,
                    _ => event::MESSAGE_ERROR,
                };
                self.push(
                    notice,
                    NoticePayload {
                        message: e.user_message(),
                    },
                )
                .await;
                self.fail(event::SEND_MESSAGE, ack, &e).await;
            }
        }
    }

    async fn typing(&self, ack: Option<u64>, request: TypingRequest) {
        if let Some(notice) = self
            .state
            .typing_usecase
            .execute(self.connection_id, &request.room_id)
            .await
        {
            broadcast_event(
                self.state.message_pusher.as_ref(),
                &notice.targets,
                event::TYPING_INDICATOR,
                TypingIndicatorPayload {
                    username: notice.username.into_string(),
                    is_typing: request.is_typing,
                },
            )
            .await;
        }
        self.reply(event::TYPING, ack, StatusAck::ok()).await;
    }

    async fn admin_login(&self, ack: Option<u64>, request: AdminLoginRequest) {
        let authenticated = self
            .state
            .admin_usecase
            .authenticate(self.connection_id, &request.secret)
            .await;
        if !authenticated {
            self.reply(
                event::ADMIN_LOGIN,
                ack,
                StatusAck::failed("Invalid admin secret."),
            )
            .await;
            return;
        }

        self.reply(event::ADMIN_LOGIN, ack, StatusAck::ok()).await;
        self.push(event::ADMIN_AUTHENTICATED, AdminAuthenticatedPayload {})
            .await;

        let payload = match self.state.admin_usecase.snapshot().await {
            Ok(rooms) => ActiveRoomsListPayload {
                rooms: rooms.iter().map(RoomSummaryDto::from).collect(),
                message: None,
            },
            Err(e) => {
                tracing::warn!("Failed to load rooms for admin {}: {}", self.connection_id, e);
                ActiveRoomsListPayload {
                    rooms: Vec::new(),
                    message: Some("Failed to load rooms.".to_string()),
                }
            }
        };
        self.push(event::ACTIVE_ROOMS_LIST, payload).await;
    }

    async fn list_rooms(&self, ack: Option<u64>) {
        match self.state.admin_usecase.list_rooms(&self.connection_id).await {
            Ok(rooms) => {
                self.reply(
                    event::LIST_ROOMS,
                    ack,
                    ListRoomsAck {
                        success: true,
                        rooms: rooms.iter().map(RoomSummaryDto::from).collect(),
                    },
                )
                .await;
            }
            Err(e) => self.fail(event::LIST_ROOMS, ack, &e).await,
        }
    }

    async fn delete_room(&self, ack: Option<u64>, request: DeleteRoomRequest) {
        let room_id = match RoomId::new(&request.room_id) {
            Ok(room_id) => room_id,
            Err(_) => {
                let error = if self.state.admin_sessions.is_admin(&self.connection_id).await {
                    ChatError::RoomNotFound
                } else {
                    ChatError::Unauthorized
                };
                return self.fail(event::DELETE_ROOM, ack, &error).await;
            }
        };

        let Some(notice) = encode_push(
            event::ROOM_DELETED_USER_NOTIFY,
            NoticePayload {
                message: format!(
                    "This room ({}) has been deleted by an administrator. You will be disconnected.",
                    room_id
                ),
            },
        ) else {
            return;
        };

        match self
            .state
            .admin_usecase
            .delete_room(&self.connection_id, &room_id, &notice)
            .await
        {
            Ok(deletion) => {
                self.reply(
                    event::DELETE_ROOM,
                    ack,
                    StatusAck::ok_with(format!("Room {} deleted.", deletion.room_id)),
                )
                .await;
                broadcast_event(
                    self.state.message_pusher.as_ref(),
                    &deletion.notify,
                    event::ROOM_DELETED_ADMIN_NOTIFY,
                    RoomDeletedAdminPayload {
                        room_id: deletion.room_id.to_string(),
                        message: format!(
                            "Room {} was deleted by another administrator.",
                            deletion.room_id
                        ),
                    },
                )
                .await;
            }
            Err(e) => self.fail(event::DELETE_ROOM, ack, &e).await,
        }
    }

    // ========================================
    // Helpers
    // ========================================

    async fn announce_departure(&self, departure: &Departure) {
        broadcast_event(
            self.state.message_pusher.as_ref(),
            &departure.notify,
            event::USER_LEFT,
            PresencePayload {
                username: departure.participant.name.as_str().to_string(),
                active_users: display_names(&departure.active_users),
            },
        )
        .await;
    }

    /// Decode `data`, answering with a failure acknowledgement if it does not fit
    async fn decode<T: DeserializeOwned>(&self, frame: &InboundFrame) -> Option<T> {
        match serde_json::from_value(frame.data.clone()) {
            Ok(request) => Some(request),
            Err(e) => {
                tracing::warn!(
                    "Invalid '{}' payload from {}: {}",
                    frame.event,
                    self.connection_id,
                    e
                );
                self.reply(&frame.event, frame.ack, StatusAck::failed("Invalid request."))
                    .await;
                None
            }
        }
    }

    async fn push<T: Serialize>(&self, event_name: &str, data: T) {
        let Some(json) = encode_push(event_name, data) else {
            return;
        };
        if let Err(e) = self
            .state
            .message_pusher
            .push_to(&self.connection_id, &json)
            .await
        {
            tracing::warn!(
                "Failed to push '{}' to {}: {}",
                event_name,
                self.connection_id,
                e
            );
        }
    }

    /// Acknowledge a request; requests without an ack id get no reply
    async fn reply<T: Serialize>(&self, event_name: &str, ack: Option<u64>, data: T) {
        let Some(ack) = ack else {
            return;
        };
        let json = match OutboundFrame::reply(event_name, ack, data).to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to encode '{}' reply: {}", event_name, e);
                return;
            }
        };
        if let Err(e) = self
            .state
            .message_pusher
            .push_to(&self.connection_id, &json)
            .await
        {
            tracing::warn!(
                "Failed to reply '{}' to {}: {}",
                event_name,
                self.connection_id,
                e
            );
        }
    }

    async fn fail(&self, event_name: &str, ack: Option<u64>, error: &ChatError) {
        tracing::info!(
            "'{}' from {} failed: {}",
            event_name,
            self.connection_id,
            error
        );
        self.reply(event_name, ack, StatusAck::failed(error.user_message()))
            .await;
    }
}
