//! Shared local store
//!
//! One JSON record per room under `yoriai-room:<roomId>`. Writers announce a
//! change by publishing the record key; subscribers re-read the record.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use yoriai_server::domain::{ChatMessage, Participant, Room, RoomId, RoomSnapshot, Timestamp};

pub const STORE_KEY_PREFIX: &str = "yoriai-room:";

/// Notifications kept for slow subscribers before they observe `Lagged`.
const NOTIFICATION_CAPACITY: usize = 64;

pub fn store_key(room_id: &RoomId) -> String {
    format!("{}{}", STORE_KEY_PREFIX, room_id)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("failed to encode room record '{key}': {reason}")]
    Encode { key: String, reason: String },

    #[error("failed to decode room record '{key}': {reason}")]
    Decode { key: String, reason: String },
}

/// Persisted form of a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub code: String,
    pub messages: Vec<ChatMessage>,
    pub participants: Vec<Participant>,
    pub last_update: Timestamp,
}

impl RoomRecord {
    pub fn from_room(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            messages: room.messages.clone(),
            participants: room.participants.clone(),
            last_update: room.last_update,
        }
    }

    /// The record does not carry a creation time; `lastUpdate` stands in for it.
    pub fn into_room(self, room_id: RoomId) -> Room {
        let last_update = self.last_update;
        Room::restore(
            room_id,
            RoomSnapshot {
                code: self.code,
                messages: self.messages,
                participants: self.participants,
            },
            last_update,
            last_update,
        )
    }
}

/// Key-value store shared by every replica on the same device
#[async_trait]
pub trait SharedStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Announce that `key` changed.
    fn notify(&self, key: &str);

    fn subscribe(&self) -> broadcast::Receiver<String>;

    async fn load_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError> {
        let key = store_key(room_id);
        let Some(json) = self.get(&key).await? else {
            return Ok(None);
        };
        let record = serde_json::from_str::<RoomRecord>(&json).map_err(|e| StoreError::Decode {
            key,
            reason: e.to_string(),
        })?;
        Ok(Some(record.into_room(room_id.clone())))
    }

    async fn save_room(&self, room: &Room) -> Result<(), StoreError> {
        let key = store_key(&room.id);
        let json = serde_json::to_string(&RoomRecord::from_room(room)).map_err(|e| {
            StoreError::Encode {
                key: key.clone(),
                reason: e.to_string(),
            }
        })?;
        self.set(&key, json).await
    }
}

/// In-memory `SharedStore` with a broadcast notification channel
pub struct InMemorySharedStore {
    entries: RwLock<HashMap<String, String>>,
    notifications: broadcast::Sender<String>,
}

impl Default for InMemorySharedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySharedStore {
    pub fn new() -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            notifications,
        }
    }

    pub async fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl SharedStore for InMemorySharedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    fn notify(&self, key: &str) {
        // No subscribers is not an error.
        let _ = self.notifications.send(key.to_string());
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.notifications.subscribe()
    }
}
