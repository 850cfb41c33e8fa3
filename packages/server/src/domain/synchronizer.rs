//! RoomSynchronizer trait 定義
//!
//! サーバーモード（権威サーバー経由）とレプリカモード（共有ストア経由）の
//! 2 つの実装が同じプロトコルを提供するための共通インターフェースです。
//! プロトコルのテストはこの trait だけを使い、両方の実装に対してそのまま実行できます。
//!
//! ## 競合の扱い
//!
//! コードは両モードともバッファ全体の last-write-wins です。マージはしません。

use async_trait::async_trait;
use thiserror::Error;

use super::{
    entity::{ChatMessage, Participant, ParticipantProfile, RoomSnapshot},
    value_object::{ParticipantId, RoomId},
};

/// 同期によって観測されるイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// 他の参加者がコードを書き換えた（自分の変更は通知されない）
    CodeUpdated {
        code: String,
        author: Option<ParticipantId>,
    },
    /// トランスクリプトにメッセージが追加された（自分のチャットも含む）
    MessageAppended(ChatMessage),
    /// 他の参加者が参加した
    ParticipantJoined(Participant),
    /// 他の参加者が退出した
    ParticipantLeft(ParticipantId),
    /// アクティブ状態が変化した
    PresenceChanged(Vec<Participant>),
}

/// 同期処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("not joined to any room")]
    NotJoined,

    #[error("already joined to room '{0}'")]
    AlreadyJoined(String),

    #[error("room '{0}' is no longer available")]
    RoomUnavailable(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("shared store error: {0}")]
    Store(String),
}

/// RoomSynchronizer trait
///
/// 1 つのインスタンスが 1 人の参加者のセッション（1 タブ / 1 接続）を表します。
#[async_trait]
pub trait RoomSynchronizer: Send + Sync {
    /// ルームに参加し、参加時点のスナップショットを返す
    async fn join(
        &self,
        room_id: RoomId,
        profile: ParticipantProfile,
    ) -> Result<RoomSnapshot, SyncError>;

    /// コードバッファ全体を置き換える
    async fn change_code(&self, code: String) -> Result<(), SyncError>;

    /// チャットメッセージを送信する
    async fn send_chat(&self, text: String) -> Result<(), SyncError>;

    /// 生存通知
    async fn heartbeat(&self) -> Result<(), SyncError>;

    /// 明示的な退出
    async fn leave(&self) -> Result<(), SyncError>;

    /// `leave` を送らずに切断する（タブを閉じる / 接続断）
    async fn disconnect(&self) -> Result<(), SyncError>;

    /// 溜まっている更新を取り込み、観測したイベントを返す
    async fn sync(&self) -> Result<Vec<SyncEvent>, SyncError>;

    /// 現在のローカルビュー
    async fn snapshot(&self) -> Option<RoomSnapshot>;
}
