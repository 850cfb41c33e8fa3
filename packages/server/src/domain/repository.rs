//! Repository trait 定義
//!
//! ドメイン層が必要とするルームレジストリのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## ロックの粒度
//!
//! ルームごとに 1 つのロックを持ちます。全体のマップに対するロックは
//! 検索・挿入・削除の間だけ保持し、ルームの変更中は保持しません。
//! 異なるルームへの操作は互いに待ち合わせません。

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use super::{
    entity::Room,
    value_object::{RoomId, Timestamp},
};

/// ロック済みのルーム。ドロップでロックが解放される。
pub type RoomGuard = OwnedMutexGuard<Room>;

/// Room Registry trait
///
/// プロセス全体で共有される「ルームキー → ルーム」の対応表。
/// グローバル変数ではなく、コンストラクタで注入します。
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    /// ルームをロックして返す。存在しなければ初期状態で作成する。
    async fn lock_or_create(&self, room_id: &RoomId, now: Timestamp) -> RoomGuard;

    /// 既存のルームをロックして返す。存在しなければ `None`。
    async fn lock(&self, room_id: &RoomId) -> Option<RoomGuard>;

    /// 接続が 1 つも残っていなければルームを削除する。削除した場合 `true`。
    async fn remove_if_idle(&self, room_id: &RoomId) -> bool;

    /// 登録されている全てのルーム ID
    async fn room_ids(&self) -> Vec<RoomId>;

    /// ルームの複製を取得
    async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        let room = self.lock(room_id).await?;
        Some(room.clone())
    }
}
