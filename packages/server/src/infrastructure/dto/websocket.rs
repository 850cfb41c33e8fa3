//! WebSocket frame DTOs.
//!
//! Every frame is a JSON object discriminated by `type` with camelCase fields.

use serde::{Deserialize, Serialize};

// ========================================
// Client → Server
// ========================================

/// Frame sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    Join { room_id: String, user: UserDto },
    #[serde(rename_all = "camelCase")]
    CodeChange { room_id: String, code: String },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        room_id: String,
        message: ChatPayload,
    },
    #[serde(rename_all = "camelCase")]
    Heartbeat { room_id: String, user_id: String },
    #[serde(rename_all = "camelCase")]
    Leave {
        room_id: String,
        user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_name: Option<String>,
    },
}

impl ClientFrame {
    pub fn room_id(&self) -> &str {
        match self {
            ClientFrame::Join { room_id, .. }
            | ClientFrame::CodeChange { room_id, .. }
            | ClientFrame::ChatMessage { room_id, .. }
            | ClientFrame::Heartbeat { room_id, .. }
            | ClientFrame::Leave { room_id, .. } => room_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientFrame::Join { .. } => "join",
            ClientFrame::CodeChange { .. } => "code-change",
            ClientFrame::ChatMessage { .. } => "chat-message",
            ClientFrame::Heartbeat { .. } => "heartbeat",
            ClientFrame::Leave { .. } => "leave",
        }
    }
}

/// Identity a client claims when joining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Body of a `chat-message` frame: plain text or `{ "message": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatPayload {
    Text(String),
    Object { message: String },
}

impl ChatPayload {
    pub fn into_text(self) -> String {
        match self {
            ChatPayload::Text(text) | ChatPayload::Object { message: text } => text,
        }
    }
}

// ========================================
// Server → Client
// ========================================

/// Frame pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerFrame {
    Init {
        code: String,
        messages: Vec<ChatMessageDto>,
        participants: Vec<ParticipantDto>,
    },
    UserJoined {
        user: ParticipantDto,
        participants: Vec<ParticipantDto>,
        message: ChatMessageDto,
    },
    #[serde(rename_all = "camelCase")]
    CodeUpdate { code: String, user_id: String },
    ChatUpdate { message: ChatMessageDto },
    #[serde(rename_all = "camelCase")]
    UserLeft {
        user_id: String,
        user_name: String,
        participants: Vec<ParticipantDto>,
        message: ChatMessageDto,
    },
    PresenceUpdate { participants: Vec<ParticipantDto> },
}

/// Participant as seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub id: String,
    pub name: String,
    pub color: String,
    pub is_owner: bool,
    pub is_active: bool,
    pub last_seen: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageTypeDto {
    Message,
    System,
}

/// Chat message as seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageDto {
    pub id: String,
    pub user: String,
    pub message: String,
    pub timestamp: i64,
    pub r#type: MessageTypeDto,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_join_frame() {
        // テスト項目: join フレームが camelCase のフィールドでデコードされる
        // given (前提条件):
        let json = r##"{"type":"join","roomId":"R1","user":{"id":"a","name":"Alice","color":"#EF4444"}}"##;

        // when (操作):
        let frame: ClientFrame = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        assert_eq!(
            frame,
            ClientFrame::Join {
                room_id: "R1".to_string(),
                user: UserDto {
                    id: "a".to_string(),
                    name: "Alice".to_string(),
                    color: Some("#EF4444".to_string()),
                },
            }
        );
        assert_eq!(frame.kind(), "join");
        assert_eq!(frame.room_id(), "R1");
    }

    #[test]
    fn test_decode_chat_message_accepts_both_shapes() {
        // テスト項目: chat-message の message は文字列とオブジェクトの両方を受け付ける
        // given (前提条件):
        let plain = r#"{"type":"chat-message","roomId":"R1","message":"hi"}"#;
        let object = r#"{"type":"chat-message","roomId":"R1","message":{"message":"hi","user":"x"}}"#;

        // when (操作):
        let plain: ClientFrame = serde_json::from_str(plain).unwrap();
        let object: ClientFrame = serde_json::from_str(object).unwrap();

        // then (期待する結果):
        for frame in [plain, object] {
            let ClientFrame::ChatMessage { message, .. } = frame else {
                panic!("expected chat-message");
            };
            assert_eq!(message.into_text(), "hi");
        }
    }

    #[test]
    fn test_decode_leave_without_user_name() {
        // テスト項目: userName のない leave フレームもデコードできる
        // given (前提条件):
        let json = r#"{"type":"leave","roomId":"R1","userId":"a"}"#;

        // when (操作):
        let frame: ClientFrame = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        assert!(matches!(frame, ClientFrame::Leave { user_name: None, .. }));
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        // テスト項目: 未知の type や必須フィールド欠落はデコードエラーになる
        // given (前提条件):
        let unknown = r#"{"type":"dance","roomId":"R1"}"#;
        let missing = r#"{"type":"code-change","roomId":"R1"}"#;

        // when (操作):
        let unknown = serde_json::from_str::<ClientFrame>(unknown);
        let missing = serde_json::from_str::<ClientFrame>(missing);

        // then (期待する結果):
        assert!(unknown.is_err());
        assert!(missing.is_err());
    }

    #[test]
    fn test_encode_code_update_frame() {
        // テスト項目: code-update フレームが type と camelCase フィールドでエンコードされる
        // given (前提条件):
        let frame = ServerFrame::CodeUpdate {
            code: "let x = 1;".to_string(),
            user_id: "a".to_string(),
        };

        // when (操作):
        let json = serde_json::to_value(&frame).unwrap();

        // then (期待する結果):
        assert_eq!(
            json,
            serde_json::json!({"type": "code-update", "code": "let x = 1;", "userId": "a"})
        );
    }

    #[test]
    fn test_encode_system_message_omits_color() {
        // テスト項目: システムメッセージの DTO は color を出力しない
        // given (前提条件):
        let message = ChatMessageDto {
            id: "welcome-1".to_string(),
            user: "System".to_string(),
            message: "Welcome".to_string(),
            timestamp: 1_000,
            r#type: MessageTypeDto::System,
            color: None,
        };

        // when (操作):
        let json = serde_json::to_value(ServerFrame::ChatUpdate { message }).unwrap();

        // then (期待する結果):
        assert_eq!(json["type"], "chat-update");
        assert_eq!(json["message"]["type"], "system");
        assert!(json["message"].get("color").is_none());
    }
}
