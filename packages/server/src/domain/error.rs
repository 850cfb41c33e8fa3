//! ドメイン層のエラー型

use thiserror::Error;

/// 値オブジェクトの検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("room id must not be empty")]
    EmptyRoomId,

    #[error("room id must be at most {0} characters")]
    RoomIdTooLong(usize),

    #[error("participant id must not be empty")]
    EmptyParticipantId,

    #[error("participant id must be at most {0} characters")]
    ParticipantIdTooLong(usize),
}

/// メッセージ送信（MessagePusher）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("failed to deliver to {} connection(s) in room '{}'", .failed.len(), .room_id)]
    Undelivered { room_id: String, failed: Vec<String> },
}
