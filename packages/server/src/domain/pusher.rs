//! MessagePusher trait 定義
//!
//! クライアントへのメッセージ送信のインターフェースです。
//! WebSocket の生成は UI 層、送信チャンネルの管理は Infrastructure 層が担います。

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    error::MessagePushError,
    value_object::{ParticipantId, RoomId},
};

/// クライアントへの送信チャンネル（JSON テキストを送る）
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// 接続を識別するキー（ルームと参加者の組）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
}

impl ConnectionKey {
    pub fn new(room_id: RoomId, participant_id: ParticipantId) -> Self {
        Self {
            room_id,
            participant_id,
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.room_id, self.participant_id)
    }
}

/// MessagePusher trait
///
/// ブロードキャストは宛先ごとのベストエフォートです。
/// 一部の宛先への送信失敗で残りの宛先への送信を中断しません。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続を登録（同じキーの既存接続は置き換えられる）
    async fn register_client(&self, key: ConnectionKey, sender: PusherChannel);

    /// 接続を登録解除
    ///
    /// 登録されているチャンネルが `sender` と同一の場合のみ解除し、`true` を返す。
    /// 後から同じキーで接続し直したクライアントを誤って解除しないため。
    async fn unregister_client(&self, key: &ConnectionKey, sender: &PusherChannel) -> bool;

    /// 同じルームの複数の接続に送信
    ///
    /// 全ての宛先に送信を試みてから、届かなかった宛先をまとめてエラーで返す。
    async fn broadcast(
        &self,
        room_id: &RoomId,
        targets: Vec<ParticipantId>,
        content: &str,
    ) -> Result<(), MessagePushError>;
}
