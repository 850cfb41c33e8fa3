//! UseCase: ハートビート処理

use std::sync::Arc;

use yoriai_shared::time::Clock;

use crate::{
    domain::{
        Audience, HeartbeatOutcome, MessagePusher, ParticipantId, RoomId, RoomRegistry,
        Timestamp, presence::record_heartbeat,
    },
    infrastructure::dto::conversion::presence_update_frame,
};

use super::delivery::deliver;

/// ハートビートのユースケース
pub struct HeartbeatUseCase {
    registry: Arc<dyn RoomRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl HeartbeatUseCase {
    pub fn new(
        registry: Arc<dyn RoomRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            message_pusher,
            clock,
        }
    }

    /// `lastSeen` を更新し、非アクティブだった参加者を即座にアクティブに戻す
    ///
    /// アクティブ状態が変わった場合のみ `presence-update` を全員に送ります。
    pub async fn execute(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> HeartbeatOutcome {
        let Some(mut room) = self.registry.lock(room_id).await else {
            tracing::debug!("Heartbeat for unknown room '{}' ignored", room_id);
            return HeartbeatOutcome::UnknownParticipant;
        };

        let now = Timestamp::new(self.clock.now_millis());
        let outcome = record_heartbeat(&mut room, participant_id, now);
        match outcome {
            HeartbeatOutcome::Reactivated => {
                tracing::info!(
                    "Participant '{}' in room '{}' is active again",
                    participant_id,
                    room_id
                );
                deliver(
                    self.message_pusher.as_ref(),
                    &room,
                    Audience::Everyone,
                    &presence_update_frame(&room.participants),
                )
                .await;
            }
            HeartbeatOutcome::Refreshed => {
                tracing::debug!("Heartbeat from '{}' in room '{}'", participant_id, room_id);
            }
            HeartbeatOutcome::UnknownParticipant => {
                tracing::warn!(
                    "Heartbeat from unknown participant '{}' in room '{}'",
                    participant_id,
                    room_id
                );
            }
        }
        outcome
    }
}
