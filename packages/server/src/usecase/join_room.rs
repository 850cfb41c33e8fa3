//! UseCase: ルーム参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - ルームの遅延作成、参加者の追加、init / user-joined の配信
//!
//! ### どのような状況を想定しているか
//! - 正常系：最初の参加者（ルーム作成 + オーナー）、後続の参加者
//! - エッジケース：同じ ID での再参加

use std::sync::Arc;

use yoriai_shared::time::Clock;

use crate::{
    domain::{
        ConnectionKey, MessagePusher, Participant, ParticipantProfile, PusherChannel, RoomEvent,
        RoomId, RoomRegistry, Timestamp,
    },
    infrastructure::dto::conversion::{init_frame, user_joined_frame},
};

use super::delivery::deliver;

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    /// RoomRegistry（ルームの保持と排他制御）
    registry: Arc<dyn RoomRegistry>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl JoinRoomUseCase {
    pub fn new(
        registry: Arc<dyn RoomRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            message_pusher,
            clock,
        }
    }

    /// 参加処理を実行
    ///
    /// ルームがなければシード状態で作成し、参加者を追加した上で
    /// 参加者本人に `init`、他の接続に `user-joined` を送ります。
    ///
    /// # Arguments
    ///
    /// * `room_id` - 参加するルーム
    /// * `profile` - クライアントが名乗った参加者情報
    /// * `sender` - この接続へのメッセージ送信用チャンネル
    pub async fn execute(
        &self,
        room_id: RoomId,
        profile: ParticipantProfile,
        sender: PusherChannel,
    ) -> Participant {
        let now = Timestamp::new(self.clock.now_millis());
        let mut room = self.registry.lock_or_create(&room_id, now).await;

        let outcome = room.add_participant(profile, now);
        let participant_id = outcome.participant.id.clone();
        room.attach_connection(participant_id.clone());
        self.message_pusher
            .register_client(ConnectionKey::new(room_id.clone(), participant_id.clone()), sender)
            .await;

        tracing::info!(
            "Participant '{}' {} room '{}' (owner: {}, active: {})",
            participant_id,
            if outcome.rejoined { "rejoined" } else { "joined" },
            room_id,
            outcome.participant.is_owner,
            room.active_count()
        );

        deliver(
            self.message_pusher.as_ref(),
            &room,
            RoomEvent::Init.audience(&participant_id),
            &init_frame(room.snapshot()),
        )
        .await;
        deliver(
            self.message_pusher.as_ref(),
            &room,
            RoomEvent::UserJoined.audience(&participant_id),
            &user_joined_frame(
                outcome.participant.clone(),
                &room.participants,
                outcome.notice,
            ),
        )
        .await;

        outcome.participant
    }
}
