//! Connection Manager
//!
//! 1 本の WebSocket 接続に対応し、受信フレームをデコードしてユースケースに
//! 振り分けます。
//!
//! ## 状態遷移
//!
//! ```text
//! Connecting --join--> Joined --leave--> Connecting
//!     |                  |
//!     +------close-------+-----close-----> Closed
//! ```
//!
//! 参加中のアクティブ / アイドルはプレゼンスのスイープが判定するため、
//! 接続の状態としては持ちません。
//!
//! 明示的な `leave` と接続の切断は同じ後始末に収束し、後始末は
//! 1 回の参加につき最大 1 回だけ実行されます。

use std::sync::Arc;

use crate::{
    domain::{ParticipantId, ParticipantProfile, PusherChannel, RoomId},
    infrastructure::dto::websocket::ClientFrame,
};

use super::state::AppState;

/// 現在の参加先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Joined(Membership),
    Closed,
}

/// 1 接続分の Connection Manager
pub struct Connection {
    state: Arc<AppState>,
    /// この接続へのメッセージ送信用チャンネル（参加時に MessagePusher に登録）
    sender: PusherChannel,
    phase: ConnectionState,
}

impl Connection {
    pub fn new(state: Arc<AppState>, sender: PusherChannel) -> Self {
        Self {
            state,
            sender,
            phase: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.phase
    }

    /// Handle one inbound text frame. Malformed or out-of-order frames are
    /// logged and dropped; the connection stays open.
    pub async fn handle_text(&mut self, text: &str) {
        if self.phase == ConnectionState::Closed {
            tracing::warn!("Frame received after close, dropping");
            return;
        }

        let frame = match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Failed to decode frame: {} ({})", e, text);
                return;
            }
        };
        tracing::debug!("Received '{}' frame for room '{}'", frame.kind(), frame.room_id());

        if let ClientFrame::Join { room_id, user } = frame {
            let (room_id, participant_id) = match (RoomId::new(room_id), ParticipantId::new(user.id))
            {
                (Ok(room_id), Ok(participant_id)) => (room_id, participant_id),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!("Rejected join frame: {}", e);
                    return;
                }
            };
            self.join(room_id, ParticipantProfile::new(participant_id, user.name, user.color))
                .await;
            return;
        }

        let ConnectionState::Joined(membership) = &self.phase else {
            tracing::warn!("'{}' frame received before join, dropping", frame.kind());
            return;
        };
        if frame.room_id() != membership.room_id.as_str() {
            tracing::warn!(
                "'{}' frame for room '{}' does not match joined room '{}', dropping",
                frame.kind(),
                frame.room_id(),
                membership.room_id
            );
            return;
        }
        let membership = membership.clone();

        match frame {
            ClientFrame::CodeChange { code, .. } => {
                self.state
                    .change_code_usecase
                    .execute(&membership.room_id, &membership.participant_id, code)
                    .await;
            }
            ClientFrame::ChatMessage { message, .. } => {
                if let Err(e) = self
                    .state
                    .send_chat_usecase
                    .execute(
                        &membership.room_id,
                        &membership.participant_id,
                        message.into_text(),
                    )
                    .await
                {
                    tracing::warn!("Failed to send chat message: {}", e);
                }
            }
            ClientFrame::Heartbeat { user_id, .. } => {
                if user_id != membership.participant_id.as_str() {
                    tracing::warn!(
                        "Heartbeat for '{}' on connection of '{}', dropping",
                        user_id,
                        membership.participant_id
                    );
                    return;
                }
                self.state
                    .heartbeat_usecase
                    .execute(&membership.room_id, &membership.participant_id)
                    .await;
            }
            ClientFrame::Leave { user_id, .. } => {
                if user_id != membership.participant_id.as_str() {
                    tracing::warn!(
                        "Leave for '{}' on connection of '{}', dropping",
                        user_id,
                        membership.participant_id
                    );
                    return;
                }
                self.cleanup().await;
            }
            ClientFrame::Join { .. } => {}
        }
    }

    /// Run the leave cleanup (if still joined) and refuse further frames.
    pub async fn close(&mut self) {
        self.cleanup().await;
        self.phase = ConnectionState::Closed;
    }

    async fn join(&mut self, room_id: RoomId, profile: ParticipantProfile) {
        // A second join on the same connection ends the previous membership first.
        self.cleanup().await;

        let participant = self
            .state
            .join_room_usecase
            .execute(room_id.clone(), profile, self.sender.clone())
            .await;
        self.phase = ConnectionState::Joined(Membership {
            room_id,
            participant_id: participant.id,
        });
    }

    async fn cleanup(&mut self) {
        let ConnectionState::Joined(membership) =
            std::mem::replace(&mut self.phase, ConnectionState::Connecting)
        else {
            return;
        };

        self.state
            .leave_room_usecase
            .execute(&membership.room_id, &membership.participant_id, &self.sender)
            .await;
    }
}
