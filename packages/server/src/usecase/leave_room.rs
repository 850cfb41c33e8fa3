//! UseCase: ルーム退出処理
//!
//! 明示的な `leave` と接続の切断はどちらもこのユースケースに収束します。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LeaveRoomUseCase::execute() メソッド
//! - 参加者の非アクティブ化、退出通知、user-left の配信、空になったルームの削除
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者が残るルームからの退出
//! - 正常系：最後の接続の退出でルームが削除される
//! - エッジケース：新しい接続に置き換えられた古い接続の切断
//! - エッジケース：存在しないルーム

use std::sync::Arc;

use yoriai_shared::time::Clock;

use crate::{
    domain::{
        ConnectionKey, LeaveOutcome, MessagePusher, ParticipantId, PusherChannel, RoomEvent,
        RoomId, RoomRegistry, Timestamp,
    },
    infrastructure::dto::conversion::user_left_frame,
};

use super::delivery::deliver;

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    registry: Arc<dyn RoomRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl LeaveRoomUseCase {
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

    /// 退出処理を実行
    ///
    /// `sender` が現在登録されている接続でなければ（同じ参加者が別の接続で
    /// 参加し直している場合）何もしません。
    ///
    /// # Returns
    ///
    /// * `Some(LeaveOutcome)` - 退出処理を行った
    /// * `None` - ルームが存在しない、または接続が置き換え済み
    pub async fn execute(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        sender: &PusherChannel,
    ) -> Option<LeaveOutcome> {
        let Some(mut room) = self.registry.lock(room_id).await else {
            tracing::debug!("Leave for unknown room '{}' ignored", room_id);
            return None;
        };

        let key = ConnectionKey::new(room_id.clone(), participant_id.clone());
        if !self.message_pusher.unregister_client(&key, sender).await {
            tracing::debug!("Connection '{}' is not current, skipping leave", key);
            return None;
        }
        room.detach_connection(participant_id);

        let now = Timestamp::new(self.clock.now_millis());
        let outcome = room.remove_participant(participant_id, now);
        if let Some(outcome) = &outcome {
            tracing::info!(
                "Participant '{}' left room '{}' (active: {})",
                participant_id,
                room_id,
                room.active_count()
            );
            deliver(
                self.message_pusher.as_ref(),
                &room,
                RoomEvent::UserLeft.audience(participant_id),
                &user_left_frame(
                    outcome.participant.clone(),
                    &room.participants,
                    outcome.notice.clone(),
                ),
            )
            .await;
        }

        let idle = !room.has_connections();
        // Registry must not be called while the room lock is held.
        drop(room);
        if idle && self.registry.remove_if_idle(room_id).await {
            tracing::info!("Room '{}' deleted after last connection left", room_id);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{RoomRegistry, WELCOME_CODE},
        usecase::{
            JoinRoomUseCase,
            test_support::{Fixture, channel, drain, pid, profile, room_id},
        },
    };

    fn usecases(fixture: &Fixture) -> (JoinRoomUseCase, LeaveRoomUseCase) {
        (
            JoinRoomUseCase::new(
                fixture.registry.clone(),
                fixture.pusher.clone(),
                fixture.clock.clone(),
            ),
            LeaveRoomUseCase::new(
                fixture.registry.clone(),
                fixture.pusher.clone(),
                fixture.clock.clone(),
            ),
        )
    }

    #[tokio::test]
    async fn test_leave_notifies_remaining_participants() {
        // テスト項目: 退出すると残りの参加者に user-left が届き、レコードは非アクティブで残る
        // given (前提条件):
        let fixture = Fixture::new();
        let (join, leave) = usecases(&fixture);
        let (tx_a, _rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        join.execute(room_id("R1"), profile("a", "Alice"), tx_a.clone()).await;
        join.execute(room_id("R1"), profile("b", "Bob"), tx_b).await;
        drain(&mut rx_b);

        // when (操作):
        let outcome = leave.execute(&room_id("R1"), &pid("a"), &tx_a).await;

        // then (期待する結果):
        assert!(outcome.is_some());
        let frames = drain(&mut rx_b);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "user-left");
        assert_eq!(frames[0]["userId"], "a");
        assert_eq!(frames[0]["userName"], "Alice");
        assert_eq!(frames[0]["message"]["message"], "Alice left the room");

        let room = fixture.registry.get_room(&room_id("R1")).await.unwrap();
        let alice = room.participant(&pid("a")).unwrap();
        assert!(!alice.is_active);
        assert!(alice.is_owner);
        assert!(!room.connections.contains(&pid("a")));
    }

    #[tokio::test]
    async fn test_last_leave_deletes_room_and_rejoin_reseeds() {
        // テスト項目: 最後の接続が退出するとルームが削除され、再参加でシード状態から始まる
        // given (前提条件):
        let fixture = Fixture::new();
        let (join, leave) = usecases(&fixture);
        let (tx_a, _rx_a) = channel();
        join.execute(room_id("R1"), profile("a", "Alice"), tx_a.clone()).await;

        // when (操作):
        leave.execute(&room_id("R1"), &pid("a"), &tx_a).await;
        let removed = fixture.registry.get_room(&room_id("R1")).await;
        let (tx_b, mut rx_b) = channel();
        let bob = join.execute(room_id("R1"), profile("b", "Bob"), tx_b).await;

        // then (期待する結果):
        assert!(removed.is_none());
        assert!(bob.is_owner);
        let init = &drain(&mut rx_b)[0];
        assert_eq!(init["code"], WELCOME_CODE);
        assert_eq!(init["participants"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_superseded_connection_does_not_leave() {
        // テスト項目: 置き換えられた古い接続の切断では退出処理を行わない
        // given (前提条件):
        let fixture = Fixture::new();
        let (join, leave) = usecases(&fixture);
        let (tx_old, _rx_old) = channel();
        let (tx_new, _rx_new) = channel();
        join.execute(room_id("R1"), profile("a", "Alice"), tx_old.clone()).await;
        join.execute(room_id("R1"), profile("a", "Alice"), tx_new).await;

        // when (操作):
        let outcome = leave.execute(&room_id("R1"), &pid("a"), &tx_old).await;

        // then (期待する結果):
        assert!(outcome.is_none());
        let room = fixture.registry.get_room(&room_id("R1")).await.unwrap();
        assert!(room.participant(&pid("a")).unwrap().is_active);
        assert!(room.connections.contains(&pid("a")));
    }

    #[tokio::test]
    async fn test_leave_unknown_room_is_noop() {
        // テスト項目: 存在しないルームからの退出は何もしない
        // given (前提条件):
        let fixture = Fixture::new();
        let (_, leave) = usecases(&fixture);
        let (tx, _rx) = channel();

        // when (操作):
        let outcome = leave.execute(&room_id("nowhere"), &pid("a"), &tx).await;

        // then (期待する結果):
        assert!(outcome.is_none());
        assert!(fixture.registry.room_ids().await.is_empty());
    }
}
