//! ブロードキャストの宛先決定（Broadcast Router のドメインロジック）
//!
//! イベント種別ごとに「誰に届けるか」を決める純粋関数です。
//! 実際の送信は `MessagePusher` が行います。
//!
//! | イベント | 宛先 |
//! |---|---|
//! | `init` | 参加した本人のみ |
//! | `code-update` | 送信者以外の全接続 |
//! | `chat-update` | 送信者を含む全接続 |
//! | `user-joined` / `user-left` | 対象者以外の全接続 |
//! | `presence-update` | 全接続 |

use super::{entity::Room, value_object::ParticipantId};

/// ルームで発生するイベント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    Init,
    CodeChange,
    ChatMessage,
    UserJoined,
    UserLeft,
    PresenceUpdate,
}

/// 配信対象
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Only(ParticipantId),
    Everyone,
    EveryoneExcept(ParticipantId),
}

impl RoomEvent {
    /// Who receives this event when it originates from (or concerns) `origin`.
    pub fn audience(self, origin: &ParticipantId) -> Audience {
        match self {
            RoomEvent::Init => Audience::Only(origin.clone()),
            RoomEvent::CodeChange | RoomEvent::UserJoined | RoomEvent::UserLeft => {
                Audience::EveryoneExcept(origin.clone())
            }
            RoomEvent::ChatMessage | RoomEvent::PresenceUpdate => Audience::Everyone,
        }
    }
}

/// Resolve an audience against the room's live connections.
pub fn recipients(room: &Room, audience: &Audience) -> Vec<ParticipantId> {
    room.connections
        .iter()
        .filter(|id| match audience {
            Audience::Only(target) => *id == target,
            Audience::Everyone => true,
            Audience::EveryoneExcept(excluded) => *id != excluded,
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RoomId, Timestamp};

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id.to_string()).unwrap()
    }

    fn room_with_connections(ids: &[&str]) -> Room {
        let mut room = Room::seeded(RoomId::new("R1".to_string()).unwrap(), Timestamp::new(0));
        for id in ids {
            room.attach_connection(pid(id));
        }
        room
    }

    #[test]
    fn test_code_change_excludes_sender() {
        // テスト項目: コード変更は送信者以外の全接続に届く
        // given (前提条件):
        let room = room_with_connections(&["alice", "bob", "charlie"]);

        // when (操作):
        let audience = RoomEvent::CodeChange.audience(&pid("alice"));
        let targets = recipients(&room, &audience);

        // then (期待する結果):
        assert_eq!(targets, vec![pid("bob"), pid("charlie")]);
    }

    #[test]
    fn test_chat_message_includes_sender() {
        // テスト項目: チャットは送信者を含む全接続に届く
        // given (前提条件):
        let room = room_with_connections(&["alice", "bob"]);

        // when (操作):
        let audience = RoomEvent::ChatMessage.audience(&pid("alice"));
        let targets = recipients(&room, &audience);

        // then (期待する結果):
        assert_eq!(targets, vec![pid("alice"), pid("bob")]);
    }

    #[test]
    fn test_membership_events_exclude_subject() {
        // テスト項目: 参加・退出通知は対象者以外に届く
        // given (前提条件):
        let room = room_with_connections(&["alice", "bob"]);

        // when (操作):
        let joined = recipients(&room, &RoomEvent::UserJoined.audience(&pid("bob")));
        let left = recipients(&room, &RoomEvent::UserLeft.audience(&pid("alice")));

        // then (期待する結果):
        assert_eq!(joined, vec![pid("alice")]);
        assert_eq!(left, vec![pid("bob")]);
    }

    #[test]
    fn test_init_is_unicast() {
        // テスト項目: init は参加した本人だけに届く
        // given (前提条件):
        let room = room_with_connections(&["alice", "bob"]);

        // when (操作):
        let targets = recipients(&room, &RoomEvent::Init.audience(&pid("bob")));

        // then (期待する結果):
        assert_eq!(targets, vec![pid("bob")]);
    }

    #[test]
    fn test_disconnected_participants_are_not_recipients() {
        // テスト項目: 接続していない参加者は宛先に含まれない
        // given (前提条件):
        let mut room = room_with_connections(&["alice", "bob"]);
        room.detach_connection(&pid("bob"));

        // when (操作):
        let targets = recipients(&room, &RoomEvent::PresenceUpdate.audience(&pid("alice")));

        // then (期待する結果):
        assert_eq!(targets, vec![pid("alice")]);
    }
}
