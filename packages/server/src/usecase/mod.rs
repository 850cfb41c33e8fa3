//! UseCase 層
//!
//! 各ユースケースはルームのロックを取得してから状態を変更し、
//! ロックを保持したままイベントを配信します。これにより全ての接続が
//! ルームの変更順でイベントを受け取ります。

mod change_code;
mod delivery;
mod error;
mod heartbeat;
mod join_room;
mod leave_room;
mod send_chat;
mod sweep_presence;

#[cfg(test)]
pub(crate) mod test_support;

pub use change_code::ChangeCodeUseCase;
pub use error::UseCaseError;
pub use heartbeat::HeartbeatUseCase;
pub use join_room::JoinRoomUseCase;
pub use leave_room::LeaveRoomUseCase;
pub use send_chat::SendChatUseCase;
pub use sweep_presence::SweepPresenceUseCase;
