//! Server state shared by every connection handler.

use std::sync::Arc;

use hushroom_shared::time::Clock;

use crate::{
    config::Settings,
    domain::{IdentifierGenerator, MessagePusher, RateLimiter, RoomRegistry, RoomStore},
    infrastructure::{message_pusher::WebSocketMessagePusher, registry::InMemoryRoomRegistry},
    usecase::{
        AdminSessions, AdminUseCase, CreateRoomUseCase, DisconnectParticipantUseCase,
        JoinRoomUseCase, PersistenceBridge, SendMessageUseCase, SweepExpiredRoomsUseCase,
        TypingUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// MessagePusher（メッセージ通知の抽象化）
    pub message_pusher: Arc<dyn MessagePusher>,
    pub rate_limiter: Arc<RateLimiter>,
    pub admin_sessions: Arc<AdminSessions>,
    pub create_room_usecase: Arc<CreateRoomUseCase>,
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub typing_usecase: Arc<TypingUseCase>,
    pub admin_usecase: Arc<AdminUseCase>,
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    pub sweep_expired_rooms_usecase: Arc<SweepExpiredRoomsUseCase>,
}

impl AppState {
    /// Wire every use case around one durable store.
    ///
    /// Dependencies are created in order: registry and pusher, Persistence Bridge,
    /// then the use cases.
    pub fn build(
        store: Arc<dyn RoomStore>,
        settings: &Settings,
        clock: Arc<dyn Clock>,
        generator: Arc<dyn IdentifierGenerator>,
    ) -> Self {
        let registry: Arc<dyn RoomRegistry> =
            Arc::new(InMemoryRoomRegistry::new(settings.history_limit));
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());
        let rate_limiter = Arc::new(RateLimiter::new(settings.rate_limit, clock.clone()));
        let admin_sessions = Arc::new(AdminSessions::default());
        let bridge = Arc::new(PersistenceBridge::new(
            store,
            settings.store_timeout,
            settings.history_limit,
        ));

        let create_room_usecase = Arc::new(CreateRoomUseCase::new(
            bridge.clone(),
            registry.clone(),
            generator.clone(),
            clock.clone(),
        ));
        let join_room_usecase = Arc::new(JoinRoomUseCase::new(
            bridge.clone(),
            registry.clone(),
            generator,
            clock.clone(),
        ));
        let send_message_usecase = Arc::new(SendMessageUseCase::new(
            bridge.clone(),
            registry.clone(),
            rate_limiter.clone(),
            clock.clone(),
        ));
        let typing_usecase = Arc::new(TypingUseCase::new(registry.clone()));
        let admin_usecase = Arc::new(AdminUseCase::new(
            bridge.clone(),
            registry.clone(),
            admin_sessions.clone(),
            message_pusher.clone(),
            settings.admin_secret.clone(),
        ));
        let disconnect_participant_usecase = Arc::new(DisconnectParticipantUseCase::new(
            registry.clone(),
            rate_limiter.clone(),
            admin_sessions.clone(),
            message_pusher.clone(),
            clock.clone(),
        ));
        let expiry_millis = i64::try_from(settings.room_expiry.as_millis()).unwrap_or(i64::MAX);
        let sweep_expired_rooms_usecase = Arc::new(SweepExpiredRoomsUseCase::new(
            bridge,
            registry,
            clock,
            expiry_millis,
        ));

        if settings.admin_secret.is_none() {
            tracing::warn!("No admin secret configured; admin login is disabled");
        }

        Self {
            message_pusher,
            rate_limiter,
            admin_sessions,
            create_room_usecase,
            join_room_usecase,
            send_message_usecase,
            typing_usecase,
            admin_usecase,
            disconnect_participant_usecase,
            sweep_expired_rooms_usecase,
        }
    }
}
