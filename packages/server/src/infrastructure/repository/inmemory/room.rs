//! InMemory Room Registry 実装
//!
//! ドメイン層が定義する RoomRegistry trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。永続化はしません。
//!
//! ## ロック順序
//!
//! 1. `rooms`（マップ全体の RwLock）
//! 2. 各ルームの Mutex
//!
//! マップのロックはルームのロックを待つ間も保持することがあります（`remove_if_idle`）。
//! そのため、ルームのロックを保持したままこのレジストリのメソッドを呼んではいけません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{Room, RoomGuard, RoomId, RoomRegistry, Timestamp};

/// インメモリ Room Registry 実装
///
/// ルームごとに `Mutex` を持ち、異なるルームへの操作は並行に進みます。
#[derive(Default)]
pub struct InMemoryRoomRegistry {
    rooms: RwLock<HashMap<RoomId, Arc<Mutex<Room>>>>,
}

impl InMemoryRoomRegistry {
    /// 空の InMemoryRoomRegistry を作成
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, room_id: &RoomId) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(room_id).cloned()
    }
}

#[async_trait]
impl RoomRegistry for InMemoryRoomRegistry {
    async fn lock_or_create(&self, room_id: &RoomId, now: Timestamp) -> RoomGuard {
        loop {
            let slot = match self.slot(room_id).await {
                Some(slot) => slot,
                None => {
                    let mut rooms = self.rooms.write().await;
                    rooms
                        .entry(room_id.clone())
                        .or_insert_with(|| {
                            tracing::info!("Room '{}' created", room_id);
                            Arc::new(Mutex::new(Room::seeded(room_id.clone(), now)))
                        })
                        .clone()
                }
            };

            let room = slot.lock_owned().await;
            if !room.is_closed() {
                return room;
            }
            // 削除と競合した。新しいルームを作り直す
            tracing::debug!("Room '{}' was closed while waiting, retrying", room_id);
        }
    }

    async fn lock(&self, room_id: &RoomId) -> Option<RoomGuard> {
        let slot = self.slot(room_id).await?;
        let room = slot.lock_owned().await;
        if room.is_closed() { None } else { Some(room) }
    }

    async fn remove_if_idle(&self, room_id: &RoomId) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(slot) = rooms.get(room_id).cloned() else {
            return false;
        };

        let mut room = slot.lock().await;
        if room.has_connections() {
            return false;
        }
        room.mark_closed();
        rooms.remove(room_id);
        tracing::info!("Room '{}' deleted (no connections left)", room_id);
        true
    }

    async fn room_ids(&self) -> Vec<RoomId> {
        let rooms = self.rooms.read().await;
        let mut ids: Vec<RoomId> = rooms.keys().cloned().collect();
        ids.sort();
        ids
    }
}
