//! Domain layer: room state model, presence, broadcast routing and the
//! interfaces the outer layers implement.

pub mod broadcast;
pub mod entity;
pub mod error;
pub mod presence;
pub mod pusher;
pub mod repository;
pub mod synchronizer;
pub mod value_object;

pub use broadcast::{Audience, RoomEvent, recipients};
pub use entity::{
    ChatMessage, JoinOutcome, LeaveOutcome, MessageKind, Participant, ParticipantProfile, Room,
    RoomSnapshot, SYSTEM_SENDER, WELCOME_CODE, WELCOME_MESSAGES,
};
pub use error::{MessagePushError, ValueObjectError};
pub use presence::{HeartbeatOutcome, PresencePolicy};
#[cfg(test)]
pub use pusher::MockMessagePusher;
pub use pusher::{ConnectionKey, MessagePusher, PusherChannel};
pub use repository::{RoomGuard, RoomRegistry};
pub use synchronizer::{RoomSynchronizer, SyncError, SyncEvent};
pub use value_object::{COLOR_PALETTE, Color, ParticipantId, RoomId, Timestamp};
