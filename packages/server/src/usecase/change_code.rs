//! UseCase: コード変更処理
//!
//! コードバッファは常に丸ごと上書きされます（後勝ち、マージなし）。

use std::sync::Arc;

use yoriai_shared::time::Clock;

use crate::{
    domain::{MessagePusher, ParticipantId, RoomEvent, RoomId, RoomRegistry, Timestamp},
    infrastructure::dto::conversion::code_update_frame,
};

use super::delivery::deliver;

/// コード変更のユースケース
pub struct ChangeCodeUseCase {
    registry: Arc<dyn RoomRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ChangeCodeUseCase {
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

    /// コードを上書きし、送信者以外に `code-update` を送る
    ///
    /// 存在しないルームへの変更は何もせず `false` を返します。
    pub async fn execute(&self, room_id: &RoomId, author: &ParticipantId, code: String) -> bool {
        let Some(mut room) = self.registry.lock(room_id).await else {
            tracing::debug!("Code change for unknown room '{}' ignored", room_id);
            return false;
        };

        let now = Timestamp::new(self.clock.now_millis());
        room.replace_code(code.clone(), now);
        tracing::debug!(
            "Code in room '{}' replaced by '{}' ({} bytes)",
            room_id,
            author,
            room.code.len()
        );

        deliver(
            self.message_pusher.as_ref(),
            &room,
            RoomEvent::CodeChange.audience(author),
            &code_update_frame(code, author),
        )
        .await;
        true
    }
}
