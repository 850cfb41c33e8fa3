//! UseCase: プレゼンスの定期スイープ

use std::sync::Arc;

use yoriai_shared::time::Clock;

use crate::{
    domain::{Audience, MessagePusher, PresencePolicy, RoomRegistry, Timestamp, presence::sweep},
    infrastructure::dto::conversion::presence_update_frame,
};

use super::delivery::deliver;

/// プレゼンススイープのユースケース
///
/// ルームごとにロックを取得し、他のハンドラと排他的にスイープします。
pub struct SweepPresenceUseCase {
    registry: Arc<dyn RoomRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    policy: PresencePolicy,
}

impl SweepPresenceUseCase {
    pub fn new(
        registry: Arc<dyn RoomRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        policy: PresencePolicy,
    ) -> Self {
        Self {
            registry,
            message_pusher,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> PresencePolicy {
        self.policy
    }

    /// 全ルームをスイープし、非アクティブになった参加者の数を返す
    pub async fn execute(&self) -> usize {
        let mut total = 0;
        for room_id in self.registry.room_ids().await {
            let Some(mut room) = self.registry.lock(&room_id).await else {
                continue;
            };

            let now = Timestamp::new(self.clock.now_millis());
            let changed = sweep(&mut room, now, &self.policy);
            if changed.is_empty() {
                continue;
            }

            tracing::info!(
                "Marked {} participant(s) inactive in room '{}'",
                changed.len(),
                room_id
            );
            total += changed.len();
            deliver(
                self.message_pusher.as_ref(),
                &room,
                Audience::Everyone,
                &presence_update_frame(&room.participants),
            )
            .await;
        }
        total
    }
}
