//! UseCase 層のエラー定義

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UseCaseError {
    #[error("participant '{participant_id}' is not in room '{room_id}'")]
    ParticipantNotFound {
        room_id: String,
        participant_id: String,
    },
}
