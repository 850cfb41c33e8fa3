//! Replica Synchronizer
//!
//! Client-local equivalent of the server's Connection Manager and Room
//! Registry. Every local edit is a read-modify-write of the whole store
//! record followed by a notification; remote edits are observed by re-reading
//! the record and diffing it against the last observed view.

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;
use yoriai_server::domain::{
    ChatMessage, ParticipantId, ParticipantProfile, Room, RoomId, RoomSnapshot,
    RoomSynchronizer, SyncError, SyncEvent, Timestamp,
    presence::{record_heartbeat, sweep},
};
use yoriai_shared::time::Clock;

use crate::{
    config::ReplicaConfig,
    store::{SharedStore, StoreError, store_key},
};

impl From<StoreError> for SyncError {
    fn from(error: StoreError) -> Self {
        SyncError::Store(error.to_string())
    }
}

/// Mounted room
struct Mount {
    room_id: RoomId,
    participant_id: ParticipantId,
    /// Last observed record with activity recomputed against the local clock
    view: Room,
}

pub struct ReplicaSynchronizer {
    store: Arc<dyn SharedStore>,
    clock: Arc<dyn Clock>,
    config: ReplicaConfig,
    mount: Mutex<Option<Mount>>,
}

impl ReplicaSynchronizer {
    pub fn new(store: Arc<dyn SharedStore>, clock: Arc<dyn Clock>, config: ReplicaConfig) -> Self {
        Self {
            store,
            clock,
            config,
            mount: Mutex::new(None),
        }
    }

    pub(crate) fn config(&self) -> ReplicaConfig {
        self.config
    }

    pub(crate) fn store(&self) -> Arc<dyn SharedStore> {
        self.store.clone()
    }

    /// Store key of the mounted room.
    pub(crate) async fn mounted_key(&self) -> Option<String> {
        let mount = self.mount.lock().await;
        mount.as_ref().map(|mount| store_key(&mount.room_id))
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// A record nobody has touched within the threshold and with nobody
    /// recently seen is abandoned.
    fn is_abandoned(&self, room: &Room, now: Timestamp) -> bool {
        let policy = &self.config.presence;
        policy.is_stale(room.last_update, now)
            && !room
                .participants
                .iter()
                .any(|p| p.is_active && !policy.is_stale(p.last_seen, now))
    }

    fn observe(&self, mut room: Room, now: Timestamp) -> Room {
        sweep(&mut room, now, &self.config.presence);
        room
    }

    async fn load_latest(&self, mount: &Mount) -> Result<Room, SyncError> {
        self.store
            .load_room(&mount.room_id)
            .await?
            .ok_or_else(|| SyncError::RoomUnavailable(mount.room_id.to_string()))
    }

    async fn write(&self, room: &Room) -> Result<(), SyncError> {
        self.store.save_room(room).await?;
        self.store.notify(&store_key(&room.id));
        Ok(())
    }

    /// Leave cleanup shared by `leave` and `disconnect`. Runs at most once per mount.
    async fn unmount(&self) -> Result<(), SyncError> {
        let Some(mount) = self.mount.lock().await.take() else {
            return Err(SyncError::NotJoined);
        };

        let key = store_key(&mount.room_id);
        let Some(mut room) = self.store.load_room(&mount.room_id).await? else {
            tracing::info!("Room record '{}' already removed, nothing to clean up", key);
            return Ok(());
        };
        room.remove_participant(&mount.participant_id, self.now());

        // Silent replicas still hold the record open; abandoned records are re-seeded on mount.
        let remaining = room.active_count();
        if remaining == 0 {
            self.store.remove(&key).await?;
            self.store.notify(&key);
            tracing::info!("Room record '{}' removed after last participant left", key);
        } else {
            self.write(&room).await?;
            tracing::info!(
                "Participant '{}' left room '{}' ({} active)",
                mount.participant_id,
                mount.room_id,
                remaining
            );
        }
        Ok(())
    }
}

/// Events that turn `previous` into `current`.
///
/// A stored `isActive` flip to false means the participant left; a flip
/// produced only by the local recompute is a presence change.
fn diff(previous: &Room, current: &Room, stored: &Room) -> Vec<SyncEvent> {
    let mut events = Vec::new();

    if previous.code != current.code {
        events.push(SyncEvent::CodeUpdated {
            code: current.code.clone(),
            author: None,
        });
    }

    let mut presence_changed = false;
    for participant in &current.participants {
        match previous.participant(&participant.id) {
            None => events.push(SyncEvent::ParticipantJoined(participant.clone())),
            Some(before) if before.is_active && !participant.is_active => {
                let left = stored
                    .participant(&participant.id)
                    .is_some_and(|p| !p.is_active);
                if left {
                    events.push(SyncEvent::ParticipantLeft(participant.id.clone()));
                } else {
                    presence_changed = true;
                }
            }
            Some(before) if !before.is_active && participant.is_active => {
                presence_changed = true;
            }
            Some(_) => {}
        }
    }

    let seen: HashSet<&str> = previous.messages.iter().map(|m| m.id.as_str()).collect();
    events.extend(
        current
            .messages
            .iter()
            .filter(|m| !seen.contains(m.id.as_str()))
            .cloned()
            .map(SyncEvent::MessageAppended),
    );

    if presence_changed {
        events.push(SyncEvent::PresenceChanged(current.participants.clone()));
    }
    events
}

#[async_trait]
impl RoomSynchronizer for ReplicaSynchronizer {
    async fn join(
        &self,
        room_id: RoomId,
        profile: ParticipantProfile,
    ) -> Result<RoomSnapshot, SyncError> {
        let mut mount = self.mount.lock().await;
        if let Some(mounted) = mount.as_ref() {
            return Err(SyncError::AlreadyJoined(mounted.room_id.to_string()));
        }

        let now = self.now();
        let mut room = match self.store.load_room(&room_id).await? {
            Some(room) if !self.is_abandoned(&room, now) => room,
            Some(_) => {
                tracing::info!("Room record for '{}' is stale, re-seeding", room_id);
                Room::seeded(room_id.clone(), now)
            }
            None => {
                tracing::info!("Room '{}' created", room_id);
                Room::seeded(room_id.clone(), now)
            }
        };

        let participant_id = profile.id.clone();
        let outcome = room.add_participant(profile, now);
        self.write(&room).await?;
        tracing::info!(
            "Participant '{}' {} room '{}' (owner: {})",
            participant_id,
            if outcome.rejoined { "rejoined" } else { "joined" },
            room_id,
            outcome.participant.is_owner
        );

        let view = self.observe(room, now);
        let snapshot = view.snapshot();
        *mount = Some(Mount {
            room_id,
            participant_id,
            view,
        });
        Ok(snapshot)
    }

    async fn change_code(&self, code: String) -> Result<(), SyncError> {
        let mut mount = self.mount.lock().await;
        let mount = mount.as_mut().ok_or(SyncError::NotJoined)?;

        let now = self.now();
        let mut room = self.load_latest(mount).await?;
        room.replace_code(code.clone(), now);
        self.write(&room).await?;
        // The author never observes its own code change as an event.
        mount.view.code = code;
        Ok(())
    }

    async fn send_chat(&self, text: String) -> Result<(), SyncError> {
        let mut mount = self.mount.lock().await;
        let mount = mount.as_mut().ok_or(SyncError::NotJoined)?;

        let now = self.now();
        let mut room = self.load_latest(mount).await?;
        let sender = room
            .participant(&mount.participant_id)
            .ok_or(SyncError::NotJoined)?;
        let message = ChatMessage::from_participant(sender, text, now);
        room.append_message(message, now);
        self.write(&room).await
    }

    async fn heartbeat(&self) -> Result<(), SyncError> {
        let mut mount = self.mount.lock().await;
        let mount = mount.as_mut().ok_or(SyncError::NotJoined)?;

        let now = self.now();
        let mut room = self.load_latest(mount).await?;
        let outcome = record_heartbeat(&mut room, &mount.participant_id, now);
        tracing::debug!(
            "Heartbeat from '{}' in room '{}': {:?}",
            mount.participant_id,
            mount.room_id,
            outcome
        );
        self.write(&room).await
    }

    async fn leave(&self) -> Result<(), SyncError> {
        self.unmount().await
    }

    async fn disconnect(&self) -> Result<(), SyncError> {
        self.unmount().await
    }

    async fn sync(&self) -> Result<Vec<SyncEvent>, SyncError> {
        let mut mount = self.mount.lock().await;
        let mount = mount.as_mut().ok_or(SyncError::NotJoined)?;

        let Some(stored) = self.store.load_room(&mount.room_id).await? else {
            return Err(SyncError::RoomUnavailable(mount.room_id.to_string()));
        };
        let current = self.observe(stored.clone(), self.now());
        let events = diff(&mount.view, &current, &stored);
        mount.view = current;
        Ok(events)
    }

    async fn snapshot(&self) -> Option<RoomSnapshot> {
        let mount = self.mount.lock().await;
        mount.as_ref().map(|mount| mount.view.snapshot())
    }
}
