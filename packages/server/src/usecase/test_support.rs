//! Fixtures shared by the use case tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::sync::mpsc;

use hushroom_shared::time::FixedClock;

use crate::{
    domain::{
        ConnectionId, DisplayName, IdentifierGenerator, MessagePusher, PushFrame, RoomId,
        RoomStore, Timestamp,
    },
    infrastructure::{
        message_pusher::WebSocketMessagePusher, registry::InMemoryRoomRegistry,
        store::InMemoryRoomStore,
    },
};

use super::persistence::PersistenceBridge;

pub const START: i64 = 1_704_067_200_000;

/// Hands out pre-scripted codes and names, then falls back to fixed values.
#[derive(Default)]
pub struct ScriptedGenerator {
    codes: Mutex<VecDeque<&'static str>>,
    names: Mutex<VecDeque<&'static str>>,
}

impl ScriptedGenerator {
    pub fn new(codes: &[&'static str], names: &[&'static str]) -> Self {
        Self {
            codes: Mutex::new(codes.iter().copied().collect()),
            names: Mutex::new(names.iter().copied().collect()),
        }
    }
}

impl IdentifierGenerator for ScriptedGenerator {
    fn room_code(&self) -> RoomId {
        let code = self.codes.lock().unwrap().pop_front().unwrap_or("ZZZZZZ");
        RoomId::new(code).unwrap()
    }

    fn display_name(&self) -> DisplayName {
        let name = self
            .names
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or("Guest_Silent_Fox");
        DisplayName::new(name)
    }
}

pub struct Fixture {
    pub store: Arc<InMemoryRoomStore>,
    pub bridge: Arc<PersistenceBridge>,
    pub registry: Arc<InMemoryRoomRegistry>,
    pub pusher: Arc<WebSocketMessagePusher>,
    pub clock: Arc<FixedClock>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryRoomStore::new());
        Self {
            bridge: Arc::new(PersistenceBridge::new(
                store.clone(),
                Duration::from_secs(1),
                50,
            )),
            store,
            registry: Arc::new(InMemoryRoomRegistry::new(50)),
            pusher: Arc::new(WebSocketMessagePusher::new()),
            clock: Arc::new(FixedClock::new(START)),
        }
    }

    pub fn with_store(store: Arc<dyn RoomStore>) -> Self {
        let fixture = Self::new();
        Self {
            bridge: Arc::new(PersistenceBridge::new(store, Duration::from_secs(1), 50)),
            ..fixture
        }
    }

    pub async fn durable_room(&self, code: &str) -> RoomId {
        let room_id = RoomId::new(code).unwrap();
        self.store
            .insert_room(&room_id, Timestamp::new(START))
            .await
            .unwrap();
        room_id
    }

    pub async fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<PushFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = ConnectionId::generate();
        self.pusher.register_client(connection_id, tx).await;
        (connection_id, rx)
    }
}

/// Drain every frame currently queued for a connection.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<PushFrame>) -> Vec<PushFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}
