//! ユースケースのテスト用ヘルパー

use std::sync::Arc;

use tokio::sync::mpsc;
use yoriai_shared::time::ManualClock;

use crate::{
    domain::{ParticipantId, ParticipantProfile, PusherChannel, RoomId},
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRegistry,
    },
};

pub(crate) struct Fixture {
    pub registry: Arc<InMemoryRoomRegistry>,
    pub pusher: Arc<WebSocketMessagePusher>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(InMemoryRoomRegistry::new()),
            pusher: Arc::new(WebSocketMessagePusher::new()),
            clock: Arc::new(ManualClock::new(1_000)),
        }
    }
}

pub(crate) fn room_id(id: &str) -> RoomId {
    RoomId::new(id.to_string()).unwrap()
}

pub(crate) fn pid(id: &str) -> ParticipantId {
    ParticipantId::new(id.to_string()).unwrap()
}

pub(crate) fn profile(id: &str, name: &str) -> ParticipantProfile {
    ParticipantProfile::new(pid(id), name, None)
}

pub(crate) fn channel() -> (PusherChannel, mpsc::UnboundedReceiver<String>) {
    mpsc::unbounded_channel()
}

/// 受信済みのフレームを全て取り出して JSON として返す
pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<serde_json::Value> {
    let mut frames = Vec::new();
    while let Ok(text) = rx.try_recv() {
        frames.push(serde_json::from_str(&text).unwrap());
    }
    frames
}
