//! イベント配信の共通処理

use crate::{
    domain::{Audience, MessagePusher, ParticipantId, Room, recipients},
    infrastructure::dto::{conversion::encode, websocket::ServerFrame},
};

/// `room` の接続のうち `audience` に該当するものへ `frame` を送る
///
/// Must be called with the room lock held. Failures are logged and never
/// returned, delivery is best-effort per recipient.
pub(crate) async fn deliver(
    message_pusher: &dyn MessagePusher,
    room: &Room,
    audience: Audience,
    frame: &ServerFrame,
) -> Vec<ParticipantId> {
    let targets = recipients(room, &audience);
    if targets.is_empty() {
        return targets;
    }

    let json = match encode(frame) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to encode frame for room '{}': {}", room.id, e);
            return Vec::new();
        }
    };

    if let Err(e) = message_pusher
        .broadcast(&room.id, targets.clone(), &json)
        .await
    {
        tracing::warn!("Failed to deliver frame in room '{}': {}", room.id, e);
    }
    targets
}
