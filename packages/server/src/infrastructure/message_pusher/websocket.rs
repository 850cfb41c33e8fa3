//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を管理
//! - ルーム内の接続へのメッセージ送信（broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、メッセージ送信に使用します。
//! 送信はチャンネルへの書き込みのみで、ブロックしません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionKey, MessagePushError, MessagePusher, ParticipantId, PusherChannel, RoomId,
};

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new();
/// pusher.register_client(key.clone(), tx).await;
/// pusher.broadcast(&key.room_id, vec![key.participant_id.clone()], r#"{"type":"init"}"#).await?;
/// ```
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// ルームごとの接続中クライアントの sender
    clients: Mutex<HashMap<RoomId, HashMap<ParticipantId, PusherChannel>>>,
}

impl WebSocketMessagePusher {
    /// 新しい WebSocketMessagePusher を作成
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn count_connections(&self) -> usize {
        let clients = self.clients.lock().await;
        clients.values().map(HashMap::len).sum()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, key: ConnectionKey, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        let room = clients.entry(key.room_id.clone()).or_default();
        if room.insert(key.participant_id.clone(), sender).is_some() {
            tracing::info!("Connection '{}' replaced by a newer one", key);
        } else {
            tracing::debug!("Connection '{}' registered to MessagePusher", key);
        }
    }

    async fn unregister_client(&self, key: &ConnectionKey, sender: &PusherChannel) -> bool {
        let mut clients = self.clients.lock().await;
        let Some(room) = clients.get_mut(&key.room_id) else {
            return false;
        };

        let is_current = room
            .get(&key.participant_id)
            .is_some_and(|registered| registered.same_channel(sender));
        if !is_current {
            tracing::debug!("Connection '{}' was already superseded, keeping registration", key);
            return false;
        }

        room.remove(&key.participant_id);
        if room.is_empty() {
            clients.remove(&key.room_id);
        }
        tracing::debug!("Connection '{}' unregistered from MessagePusher", key);
        true
    }

    async fn broadcast(
        &self,
        room_id: &RoomId,
        targets: Vec<ParticipantId>,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;
        let Some(room) = clients.get(room_id) else {
            if targets.is_empty() {
                return Ok(());
            }
            return Err(MessagePushError::Undelivered {
                room_id: room_id.to_string(),
                failed: targets.iter().map(ToString::to_string).collect(),
            });
        };

        // 一部の送信失敗で残りの宛先への送信を中断しない
        let mut failed = Vec::new();
        for target in targets {
            match room.get(&target) {
                Some(sender) if sender.send(content.to_string()).is_ok() => {
                    tracing::debug!("Broadcasted message to '{}/{}'", room_id, target);
                }
                Some(_) => {
                    tracing::debug!("Channel of '{}/{}' is closed", room_id, target);
                    failed.push(target.to_string());
                }
                None => {
                    tracing::debug!("Connection '{}/{}' is not registered", room_id, target);
                    failed.push(target.to_string());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(MessagePushError::Undelivered {
                room_id: room_id.to_string(),
                failed,
            })
        }
    }
}
