//! Shared application state.

use std::sync::Arc;

use yoriai_shared::time::Clock;

use crate::{
    domain::{MessagePusher, PresencePolicy, RoomRegistry},
    usecase::{
        ChangeCodeUseCase, HeartbeatUseCase, JoinRoomUseCase, LeaveRoomUseCase, SendChatUseCase,
        SweepPresenceUseCase,
    },
};

/// Shared application state
///
/// 各ハンドラと接続はこの構造体経由でユースケースを呼び出します。
pub struct AppState {
    pub join_room_usecase: JoinRoomUseCase,
    pub leave_room_usecase: LeaveRoomUseCase,
    pub change_code_usecase: ChangeCodeUseCase,
    pub send_chat_usecase: SendChatUseCase,
    pub heartbeat_usecase: HeartbeatUseCase,
    pub sweep_presence_usecase: SweepPresenceUseCase,
}

impl AppState {
    /// Wire every use case against the same registry, pusher and clock.
    pub fn new(
        registry: Arc<dyn RoomRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        policy: PresencePolicy,
    ) -> Self {
        Self {
            join_room_usecase: JoinRoomUseCase::new(
                registry.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            leave_room_usecase: LeaveRoomUseCase::new(
                registry.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            change_code_usecase: ChangeCodeUseCase::new(
                registry.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            send_chat_usecase: SendChatUseCase::new(
                registry.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            heartbeat_usecase: HeartbeatUseCase::new(
                registry.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            sweep_presence_usecase: SweepPresenceUseCase::new(
                registry,
                message_pusher,
                clock,
                policy,
            ),
        }
    }
}
