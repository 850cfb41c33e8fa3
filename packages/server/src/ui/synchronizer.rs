//! In-process `RoomSynchronizer` backed by the server's Connection Manager.
//!
//! 送信したフレームは実際の WebSocket と同じ経路（デコード → ユースケース →
//! 配信）を通り、受信したフレームはクライアント側のミラーに反映されます。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::{
    domain::{
        ChatMessage, Participant, ParticipantId, ParticipantProfile, RoomId, RoomSnapshot,
        RoomSynchronizer, SyncError, SyncEvent,
    },
    infrastructure::dto::{
        conversion::participants_from_dto,
        websocket::{ChatPayload, ClientFrame, ServerFrame, UserDto},
    },
};

use super::{connection::Connection, state::AppState};

struct Session {
    room_id: RoomId,
    participant_id: ParticipantId,
    connection: Connection,
    inbox: mpsc::UnboundedReceiver<String>,
    mirror: RoomSnapshot,
}

impl Session {
    async fn send(&mut self, frame: &ClientFrame) -> Result<(), SyncError> {
        let text = serde_json::to_string(frame).map_err(|e| SyncError::Transport(e.to_string()))?;
        self.connection.handle_text(&text).await;
        Ok(())
    }

    /// Apply one server frame to the mirror and report what changed.
    fn apply(&mut self, frame: ServerFrame) -> Result<Vec<SyncEvent>, SyncError> {
        let events = match frame {
            ServerFrame::Init {
                code,
                messages,
                participants,
            } => {
                self.mirror = RoomSnapshot {
                    code,
                    messages: messages.into_iter().map(ChatMessage::from).collect(),
                    participants: decode_participants(participants)?,
                };
                Vec::new()
            }
            ServerFrame::UserJoined {
                user,
                participants,
                message,
            } => {
                let user = Participant::try_from(user)
                    .map_err(|e| SyncError::Transport(e.to_string()))?;
                let message = ChatMessage::from(message);
                self.mirror.participants = decode_participants(participants)?;
                self.mirror.messages.push(message.clone());
                vec![
                    SyncEvent::ParticipantJoined(user),
                    SyncEvent::MessageAppended(message),
                ]
            }
            ServerFrame::CodeUpdate { code, user_id } => {
                self.mirror.code = code.clone();
                vec![SyncEvent::CodeUpdated {
                    code,
                    author: ParticipantId::new(user_id).ok(),
                }]
            }
            ServerFrame::ChatUpdate { message } => {
                let message = ChatMessage::from(message);
                self.mirror.messages.push(message.clone());
                vec![SyncEvent::MessageAppended(message)]
            }
            ServerFrame::UserLeft {
                user_id,
                participants,
                message,
                ..
            } => {
                let user_id =
                    ParticipantId::new(user_id).map_err(|e| SyncError::Transport(e.to_string()))?;
                let message = ChatMessage::from(message);
                self.mirror.participants = decode_participants(participants)?;
                self.mirror.messages.push(message.clone());
                vec![
                    SyncEvent::ParticipantLeft(user_id),
                    SyncEvent::MessageAppended(message),
                ]
            }
            ServerFrame::PresenceUpdate { participants } => {
                self.mirror.participants = decode_participants(participants)?;
                vec![SyncEvent::PresenceChanged(self.mirror.participants.clone())]
            }
        };
        Ok(events)
    }

    fn drain(&mut self) -> Result<Vec<SyncEvent>, SyncError> {
        let mut events = Vec::new();
        while let Ok(text) = self.inbox.try_recv() {
            let frame = serde_json::from_str::<ServerFrame>(&text)
                .map_err(|e| SyncError::Transport(e.to_string()))?;
            events.extend(self.apply(frame)?);
        }
        Ok(events)
    }
}

fn decode_participants(
    participants: Vec<crate::infrastructure::dto::websocket::ParticipantDto>,
) -> Result<Vec<Participant>, SyncError> {
    participants_from_dto(participants).map_err(|e| SyncError::Transport(e.to_string()))
}

/// サーバーモードの `RoomSynchronizer`
///
/// テストや組み込み用途で、ソケットを介さずにサーバーと同じ処理経路を使います。
pub struct ServerSynchronizer {
    state: Arc<AppState>,
    session: Mutex<Option<Session>>,
}

impl ServerSynchronizer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            session: Mutex::new(None),
        }
    }
}

#[async_trait]
impl RoomSynchronizer for ServerSynchronizer {
    async fn join(
        &self,
        room_id: RoomId,
        profile: ParticipantProfile,
    ) -> Result<RoomSnapshot, SyncError> {
        let mut slot = self.session.lock().await;
        if let Some(session) = slot.as_ref() {
            return Err(SyncError::AlreadyJoined(session.room_id.to_string()));
        }

        let (tx, inbox) = mpsc::unbounded_channel();
        let mut session = Session {
            room_id: room_id.clone(),
            participant_id: profile.id.clone(),
            connection: Connection::new(self.state.clone(), tx),
            inbox,
            mirror: RoomSnapshot {
                code: String::new(),
                messages: Vec::new(),
                participants: Vec::new(),
            },
        };
        session
            .send(&ClientFrame::Join {
                room_id: room_id.into_string(),
                user: UserDto {
                    id: profile.id.into_string(),
                    name: profile.name,
                    color: profile.color,
                },
            })
            .await?;

        // The init frame is delivered before join returns.
        let text = session
            .inbox
            .try_recv()
            .map_err(|_| SyncError::Transport("no init frame after join".to_string()))?;
        let frame = serde_json::from_str::<ServerFrame>(&text)
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        if !matches!(frame, ServerFrame::Init { .. }) {
            return Err(SyncError::Transport(
                "first frame after join was not init".to_string(),
            ));
        }
        session.apply(frame)?;

        let snapshot = session.mirror.clone();
        *slot = Some(session);
        Ok(snapshot)
    }

    async fn change_code(&self, code: String) -> Result<(), SyncError> {
        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(SyncError::NotJoined)?;
        let frame = ClientFrame::CodeChange {
            room_id: session.room_id.to_string(),
            code: code.clone(),
        };
        session.send(&frame).await?;
        // The sender never receives its own code-update.
        session.mirror.code = code;
        Ok(())
    }

    async fn send_chat(&self, text: String) -> Result<(), SyncError> {
        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(SyncError::NotJoined)?;
        let frame = ClientFrame::ChatMessage {
            room_id: session.room_id.to_string(),
            message: ChatPayload::Text(text),
        };
        session.send(&frame).await
    }

    async fn heartbeat(&self) -> Result<(), SyncError> {
        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(SyncError::NotJoined)?;
        let frame = ClientFrame::Heartbeat {
            room_id: session.room_id.to_string(),
            user_id: session.participant_id.to_string(),
        };
        session.send(&frame).await
    }

    async fn leave(&self) -> Result<(), SyncError> {
        let mut slot = self.session.lock().await;
        let Some(mut session) = slot.take() else {
            return Err(SyncError::NotJoined);
        };
        let frame = ClientFrame::Leave {
            room_id: session.room_id.to_string(),
            user_id: session.participant_id.to_string(),
            user_name: None,
        };
        session.send(&frame).await?;
        session.connection.close().await;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SyncError> {
        let mut slot = self.session.lock().await;
        let Some(mut session) = slot.take() else {
            return Err(SyncError::NotJoined);
        };
        session.connection.close().await;
        Ok(())
    }

    async fn sync(&self) -> Result<Vec<SyncEvent>, SyncError> {
        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(SyncError::NotJoined)?;
        session.drain()
    }

    async fn snapshot(&self) -> Option<RoomSnapshot> {
        let slot = self.session.lock().await;
        slot.as_ref().map(|session| session.mirror.clone())
    }
}
