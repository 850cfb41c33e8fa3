//! エンティティ（Room / Participant / ChatMessage）
//!
//! ルームの状態遷移はすべてこのモジュールのメソッドを経由します。
//! サーバーモードとレプリカモードは同じ遷移ロジックを共有します。
//!
//! ## 不変条件
//!
//! - オーナー（`is_owner = true`）はルームに最大 1 人で、参加者レコード作成時に確定し、以後変更されない
//! - 参加者レコードは退出後も削除されない（`is_active = false` になるだけ）
//! - システムメッセージは色を持たない
//! - `messages` は追記のみ

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_object::{Color, ParticipantId, RoomId, Timestamp};

/// Sender name used for engine-generated messages.
pub const SYSTEM_SENDER: &str = "System";

/// Display name used when a participant joins with a blank name.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Code buffer every new room starts with.
pub const WELCOME_CODE: &str = r#"// Welcome to Yoriai!
// Everyone in this room edits the same code.
// Share the room ID to invite collaborators.

function greet(name) {
  return `Hello, ${name}!`;
}

console.log(greet("world"));
"#;

/// System messages every new room starts with, in order.
pub const WELCOME_MESSAGES: [&str; 2] = [
    "Welcome to the room! Share the room ID to invite collaborators.",
    "Code edits and chat messages are shared with everyone in this room.",
];

/// メッセージ種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Message,
    System,
}

/// チャットメッセージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// ルーム内で一意な ID
    pub id: String,
    /// 送信者の表示名（システムメッセージは `SYSTEM_SENDER`）
    pub user: String,
    pub message: String,
    pub timestamp: Timestamp,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl ChatMessage {
    /// Engine-generated message. Never carries a color.
    pub fn system(id: String, message: String, timestamp: Timestamp) -> Self {
        Self {
            id,
            user: SYSTEM_SENDER.to_string(),
            message,
            timestamp,
            kind: MessageKind::System,
            color: None,
        }
    }

    /// Human message attributed to `sender`'s display name and color.
    pub fn from_participant(sender: &Participant, message: String, timestamp: Timestamp) -> Self {
        Self {
            id: new_message_id(),
            user: sender.name.clone(),
            message,
            timestamp,
            kind: MessageKind::Message,
            color: Some(sender.color.clone()),
        }
    }

    pub fn is_system(&self) -> bool {
        self.kind == MessageKind::System
    }
}

fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

/// 参加者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub color: Color,
    pub is_owner: bool,
    pub is_active: bool,
    pub last_seen: Timestamp,
}

/// `join` で渡される参加者プロフィール
///
/// 認証は行わず、クライアントが名乗った内容をそのまま信頼します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantProfile {
    pub id: ParticipantId,
    pub name: String,
    /// 希望する表示色（パレット外なら無視される）
    pub color: Option<String>,
}

impl ParticipantProfile {
    pub fn new(id: ParticipantId, name: impl Into<String>, color: Option<String>) -> Self {
        let name = name.into();
        let name = match name.trim() {
            "" => ANONYMOUS_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };
        Self { id, name, color }
    }
}

/// `add_participant` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub participant: Participant,
    /// 追記された参加通知（システムメッセージ）
    pub notice: ChatMessage,
    /// 既存の参加者レコードを再利用したかどうか
    pub rejoined: bool,
}

/// `remove_participant` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub participant: Participant,
    /// 追記された退出通知（システムメッセージ）
    pub notice: ChatMessage,
}

/// クライアントへ送るルームのスナップショット（`init` の中身）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub code: String,
    pub messages: Vec<ChatMessage>,
    pub participants: Vec<Participant>,
}

/// ルーム
///
/// `participants` は参加順を保持するため `Vec` で持ち、ID の一意性は
/// `add_participant` が保証します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub code: String,
    pub messages: Vec<ChatMessage>,
    pub participants: Vec<Participant>,
    pub created_at: Timestamp,
    pub last_update: Timestamp,
    /// 接続中の参加者（サーバーモードのみ、永続化しない）
    pub connections: BTreeSet<ParticipantId>,
    /// レジストリから削除済み
    closed: bool,
}

impl Room {
    /// Create a room with the deterministic seed state.
    pub fn seeded(id: RoomId, now: Timestamp) -> Self {
        let messages = WELCOME_MESSAGES
            .iter()
            .enumerate()
            .map(|(index, text)| {
                ChatMessage::system(format!("welcome-{}", index + 1), text.to_string(), now)
            })
            .collect();

        Self {
            id,
            code: WELCOME_CODE.to_string(),
            messages,
            participants: Vec::new(),
            created_at: now,
            last_update: now,
            connections: BTreeSet::new(),
            closed: false,
        }
    }

    /// Rebuild a room from a persisted snapshot. Connections are never persisted.
    pub fn restore(
        id: RoomId,
        snapshot: RoomSnapshot,
        created_at: Timestamp,
        last_update: Timestamp,
    ) -> Self {
        Self {
            id,
            code: snapshot.code,
            messages: snapshot.messages,
            participants: snapshot.participants,
            created_at,
            last_update,
            connections: BTreeSet::new(),
            closed: false,
        }
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub(crate) fn participant_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.id == id)
    }

    pub fn owner(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_owner)
    }

    pub fn active_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_active).count()
    }

    /// Add (or re-activate) a participant and append the join notice.
    ///
    /// Ownership is decided only when the record is first created.
    pub fn add_participant(&mut self, profile: ParticipantProfile, now: Timestamp) -> JoinOutcome {
        let join_index = self.participants.len();
        let (participant, rejoined) = match self.participant_mut(&profile.id) {
            Some(existing) => {
                existing.name = profile.name;
                existing.is_active = true;
                existing.last_seen = now;
                (existing.clone(), true)
            }
            None => {
                let participant = Participant {
                    color: Color::assign(profile.color.as_deref(), join_index),
                    id: profile.id,
                    name: profile.name,
                    is_owner: self.participants.is_empty(),
                    is_active: true,
                    last_seen: now,
                };
                self.participants.push(participant.clone());
                (participant, false)
            }
        };

        let notice = ChatMessage::system(
            new_message_id(),
            format!("{} joined the room", participant.name),
            now,
        );
        self.append_message(notice.clone(), now);

        JoinOutcome {
            participant,
            notice,
            rejoined,
        }
    }

    /// Mark a participant inactive and append the leave notice.
    ///
    /// The record is retained. Unknown ids are a no-op.
    pub fn remove_participant(
        &mut self,
        id: &ParticipantId,
        now: Timestamp,
    ) -> Option<LeaveOutcome> {
        let participant = {
            let participant = self.participant_mut(id)?;
            participant.is_active = false;
            participant.clone()
        };

        let notice = ChatMessage::system(
            new_message_id(),
            format!("{} left the room", participant.name),
            now,
        );
        self.append_message(notice.clone(), now);

        Some(LeaveOutcome {
            participant,
            notice,
        })
    }

    /// Overwrite the code buffer. Last write wins, no merge.
    pub fn replace_code(&mut self, code: String, now: Timestamp) {
        self.code = code;
        self.touch(now);
    }

    pub fn append_message(&mut self, message: ChatMessage, now: Timestamp) {
        self.messages.push(message);
        self.touch(now);
    }

    pub(crate) fn touch(&mut self, now: Timestamp) {
        if now > self.last_update {
            self.last_update = now;
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            messages: self.messages.clone(),
            participants: self.participants.clone(),
        }
    }

    pub fn attach_connection(&mut self, id: ParticipantId) {
        self.connections.insert(id);
    }

    pub fn detach_connection(&mut self, id: &ParticipantId) -> bool {
        self.connections.remove(id)
    }

    pub fn has_connections(&self) -> bool {
        !self.connections.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark the room as removed from its registry.
    pub fn mark_closed(&mut self) {
        self.closed = true;
    }
}
