//! Conversion logic between DTOs and domain entities.

use crate::domain::{
    ChatMessage, Color, MessageKind, Participant, ParticipantId, RoomSnapshot, Timestamp,
    ValueObjectError,
};
use crate::infrastructure::dto::websocket as dto;

// ========================================
// Domain Entity → DTO
// ========================================

impl From<Participant> for dto::ParticipantDto {
    fn from(model: Participant) -> Self {
        Self {
            id: model.id.into_string(),
            name: model.name,
            color: model.color.as_str().to_string(),
            is_owner: model.is_owner,
            is_active: model.is_active,
            last_seen: model.last_seen.value(),
        }
    }
}

impl From<ChatMessage> for dto::ChatMessageDto {
    fn from(model: ChatMessage) -> Self {
        Self {
            id: model.id,
            user: model.user,
            message: model.message,
            timestamp: model.timestamp.value(),
            r#type: match model.kind {
                MessageKind::Message => dto::MessageTypeDto::Message,
                MessageKind::System => dto::MessageTypeDto::System,
            },
            color: model.color.map(|color| color.as_str().to_string()),
        }
    }
}

fn participant_list(participants: &[Participant]) -> Vec<dto::ParticipantDto> {
    participants.iter().cloned().map(Into::into).collect()
}

// ========================================
// Frame builders
// ========================================

pub fn init_frame(snapshot: RoomSnapshot) -> dto::ServerFrame {
    dto::ServerFrame::Init {
        code: snapshot.code,
        messages: snapshot.messages.into_iter().map(Into::into).collect(),
        participants: participant_list(&snapshot.participants),
    }
}

pub fn user_joined_frame(
    user: Participant,
    participants: &[Participant],
    notice: ChatMessage,
) -> dto::ServerFrame {
    dto::ServerFrame::UserJoined {
        user: user.into(),
        participants: participant_list(participants),
        message: notice.into(),
    }
}

pub fn code_update_frame(code: String, author: &ParticipantId) -> dto::ServerFrame {
    dto::ServerFrame::CodeUpdate {
        code,
        user_id: author.as_str().to_string(),
    }
}

pub fn chat_update_frame(message: ChatMessage) -> dto::ServerFrame {
    dto::ServerFrame::ChatUpdate {
        message: message.into(),
    }
}

pub fn user_left_frame(
    user: Participant,
    participants: &[Participant],
    notice: ChatMessage,
) -> dto::ServerFrame {
    dto::ServerFrame::UserLeft {
        user_id: user.id.into_string(),
        user_name: user.name,
        participants: participant_list(participants),
        message: notice.into(),
    }
}

pub fn presence_update_frame(participants: &[Participant]) -> dto::ServerFrame {
    dto::ServerFrame::PresenceUpdate {
        participants: participant_list(participants),
    }
}

/// Encode a frame as the JSON text pushed to clients.
pub fn encode(frame: &dto::ServerFrame) -> Result<String, serde_json::Error> {
    serde_json::to_string(frame)
}

// ========================================
// DTO → Domain Entity
// ========================================

impl TryFrom<dto::ParticipantDto> for Participant {
    type Error = ValueObjectError;

    fn try_from(dto: dto::ParticipantDto) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ParticipantId::new(dto.id)?,
            name: dto.name,
            color: Color::assign(Some(&dto.color), 0),
            is_owner: dto.is_owner,
            is_active: dto.is_active,
            last_seen: Timestamp::new(dto.last_seen),
        })
    }
}

impl From<dto::ChatMessageDto> for ChatMessage {
    fn from(dto: dto::ChatMessageDto) -> Self {
        Self {
            id: dto.id,
            user: dto.user,
            message: dto.message,
            timestamp: Timestamp::new(dto.timestamp),
            kind: match dto.r#type {
                dto::MessageTypeDto::Message => MessageKind::Message,
                dto::MessageTypeDto::System => MessageKind::System,
            },
            color: dto.color.map(|color| Color::assign(Some(&color), 0)),
        }
    }
}

pub fn participants_from_dto(
    participants: Vec<dto::ParticipantDto>,
) -> Result<Vec<Participant>, ValueObjectError> {
    participants.into_iter().map(Participant::try_from).collect()
}
