//! UseCase: チャット送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendChatUseCase::execute() メソッド
//! - 送信者の名前と色でのメッセージ作成、送信者を含む全員への配信
//!
//! ### どのような状況を想定しているか
//! - 正常系：送信者を含む全員に 1 回ずつ届く（MessagePusher はモック）
//! - 異常系：参加していない ID からの送信
//! - エッジケース：存在しないルーム

use std::sync::Arc;

use yoriai_shared::time::Clock;

use crate::{
    domain::{
        ChatMessage, MessagePusher, ParticipantId, RoomEvent, RoomId, RoomRegistry, Timestamp,
    },
    infrastructure::dto::conversion::chat_update_frame,
};

use super::{delivery::deliver, error::UseCaseError};

/// チャット送信のユースケース
pub struct SendChatUseCase {
    registry: Arc<dyn RoomRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl SendChatUseCase {
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

    /// メッセージを追記し、送信者を含む全員に `chat-update` を送る
    ///
    /// # Returns
    ///
    /// * `Ok(Some(ChatMessage))` - 追記されたメッセージ
    /// * `Ok(None)` - ルームが存在しない
    /// * `Err(UseCaseError::ParticipantNotFound)` - 送信者がルームの参加者でない
    pub async fn execute(
        &self,
        room_id: &RoomId,
        sender_id: &ParticipantId,
        text: String,
    ) -> Result<Option<ChatMessage>, UseCaseError> {
        let Some(mut room) = self.registry.lock(room_id).await else {
            tracing::debug!("Chat message for unknown room '{}' ignored", room_id);
            return Ok(None);
        };

        let sender = room
            .participant(sender_id)
            .ok_or_else(|| UseCaseError::ParticipantNotFound {
                room_id: room_id.to_string(),
                participant_id: sender_id.to_string(),
            })?;
        let now = Timestamp::new(self.clock.now_millis());
        let message = ChatMessage::from_participant(sender, text, now);
        room.append_message(message.clone(), now);

        let targets = deliver(
            self.message_pusher.as_ref(),
            &room,
            RoomEvent::ChatMessage.audience(sender_id),
            &chat_update_frame(message.clone()),
        )
        .await;
        tracing::debug!(
            "Chat message from '{}' in room '{}' delivered to {} connection(s)",
            sender_id,
            room_id,
            targets.len()
        );

        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessageKind, MockMessagePusher, ParticipantProfile, RoomRegistry},
        infrastructure::repository::InMemoryRoomRegistry,
        usecase::test_support::{pid, room_id},
    };
    use yoriai_shared::time::ManualClock;

    async fn registry_with(ids: &[(&str, &str)]) -> Arc<InMemoryRoomRegistry> {
        let registry = Arc::new(InMemoryRoomRegistry::new());
        let mut room = registry
            .lock_or_create(&room_id("R1"), Timestamp::new(1_000))
            .await;
        for (id, name) in ids {
            room.add_participant(
                ParticipantProfile::new(pid(id), *name, None),
                Timestamp::new(1_000),
            );
            room.attach_connection(pid(id));
        }
        drop(room);
        registry
    }

    #[tokio::test]
    async fn test_chat_is_delivered_to_everyone_including_sender() {
        // テスト項目: チャットは送信者を含む全員に 1 回だけ届く
        // given (前提条件):
        let registry = registry_with(&[("a", "Alice"), ("b", "Bob")]).await;
        let mut pusher = MockMessagePusher::new();
        pusher
            .expect_broadcast()
            .withf(|room, targets, content| {
                room.as_str() == "R1"
                    && targets == &vec![pid("a"), pid("b")]
                    && content.contains(r#""type":"chat-update""#)
                    && content.contains(r#""message":"hello""#)
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let usecase = SendChatUseCase::new(
            registry.clone(),
            Arc::new(pusher),
            Arc::new(ManualClock::new(2_000)),
        );

        // when (操作):
        let result = usecase
            .execute(&room_id("R1"), &pid("a"), "hello".to_string())
            .await;

        // then (期待する結果):
        let message = result.unwrap().unwrap();
        assert_eq!(message.user, "Alice");
        assert_eq!(message.kind, MessageKind::Message);
        assert!(message.color.is_some());
        assert_eq!(message.timestamp, Timestamp::new(2_000));

        let room = registry.get_room(&room_id("R1")).await.unwrap();
        assert_eq!(room.messages.last().unwrap(), &message);
    }

    #[tokio::test]
    async fn test_chat_from_non_participant_is_rejected() {
        // テスト項目: ルームに参加していない ID からのチャットはエラーになり、配信されない
        // given (前提条件):
        let registry = registry_with(&[("a", "Alice")]).await;
        let mut pusher = MockMessagePusher::new();
        pusher.expect_broadcast().never();
        let usecase = SendChatUseCase::new(
            registry.clone(),
            Arc::new(pusher),
            Arc::new(ManualClock::new(2_000)),
        );

        // when (操作):
        let result = usecase
            .execute(&room_id("R1"), &pid("ghost"), "hello".to_string())
            .await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(UseCaseError::ParticipantNotFound { .. })
        ));
        let room = registry.get_room(&room_id("R1")).await.unwrap();
        assert_eq!(room.messages.len(), 3);
    }

    #[tokio::test]
    async fn test_chat_for_unknown_room_is_noop() {
        // テスト項目: 存在しないルームへのチャットは何もしない
        // given (前提条件):
        let registry = Arc::new(InMemoryRoomRegistry::new());
        let mut pusher = MockMessagePusher::new();
        pusher.expect_broadcast().never();
        let usecase = SendChatUseCase::new(
            registry.clone(),
            Arc::new(pusher),
            Arc::new(ManualClock::new(2_000)),
        );

        // when (操作):
        let result = usecase
            .execute(&room_id("ghost"), &pid("a"), "hello".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(result, Ok(None));
        assert!(registry.room_ids().await.is_empty());
    }
}
