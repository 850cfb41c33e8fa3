//! プレゼンス判定（Presence Monitor のドメインロジック）
//!
//! `last_seen` とポリシーの閾値から参加者のアクティブ状態を決定する純粋関数群です。
//! サーバーの定期スイープとレプリカのポーリングは同じ関数を使います。
//! 参加者レコードは削除せず、`is_active` を切り替えるだけです。

use std::time::Duration;

use super::{
    entity::Room,
    value_object::{ParticipantId, Timestamp},
};

/// Default inactivity threshold shared by both modes.
pub const DEFAULT_INACTIVITY_THRESHOLD: Duration = Duration::from_secs(30);

/// Default interval between server-side presence sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// プレゼンス判定のポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresencePolicy {
    /// `now - last_seen` がこれを超えると非アクティブ
    pub inactivity_threshold: Duration,
    /// スイープ間隔（サーバーモード）
    pub sweep_interval: Duration,
}

impl Default for PresencePolicy {
    fn default() -> Self {
        Self {
            inactivity_threshold: DEFAULT_INACTIVITY_THRESHOLD,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl PresencePolicy {
    pub fn new(inactivity_threshold: Duration, sweep_interval: Duration) -> Self {
        Self {
            inactivity_threshold,
            sweep_interval,
        }
    }

    fn threshold_millis(&self) -> i64 {
        i64::try_from(self.inactivity_threshold.as_millis()).unwrap_or(i64::MAX)
    }

    /// Whether a participant last seen at `last_seen` should be reported inactive at `now`.
    pub fn is_stale(&self, last_seen: Timestamp, now: Timestamp) -> bool {
        now.millis_since(last_seen) > self.threshold_millis()
    }
}

/// Flip every stale active participant to inactive.
///
/// Returns the ids whose state changed, in join order.
pub fn sweep(room: &mut Room, now: Timestamp, policy: &PresencePolicy) -> Vec<ParticipantId> {
    let mut changed = Vec::new();
    for participant in room.participants.iter_mut() {
        if participant.is_active && policy.is_stale(participant.last_seen, now) {
            participant.is_active = false;
            changed.push(participant.id.clone());
        }
    }
    changed
}

/// ハートビートの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// 参加者が存在しない
    UnknownParticipant,
    /// `last_seen` を更新した（アクティブ状態は変化なし）
    Refreshed,
    /// 非アクティブからアクティブに戻った
    Reactivated,
}

/// Refresh `last_seen` and mark the participant active immediately.
pub fn record_heartbeat(room: &mut Room, id: &ParticipantId, now: Timestamp) -> HeartbeatOutcome {
    let Some(participant) = room.participant_mut(id) else {
        return HeartbeatOutcome::UnknownParticipant;
    };

    if participant.last_seen < now {
        participant.last_seen = now;
    }
    let outcome = if participant.is_active {
        HeartbeatOutcome::Refreshed
    } else {
        participant.is_active = true;
        HeartbeatOutcome::Reactivated
    };
    room.touch(now);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParticipantProfile, RoomId};

    fn room_with(ids: &[&str], joined_at: i64) -> Room {
        let mut room = Room::seeded(RoomId::new("R1".to_string()).unwrap(), Timestamp::new(0));
        for id in ids {
            room.add_participant(
                ParticipantProfile::new(ParticipantId::new(id.to_string()).unwrap(), *id, None),
                Timestamp::new(joined_at),
            );
        }
        room
    }

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id.to_string()).unwrap()
    }

    #[test]
    fn test_is_stale_uses_strict_threshold() {
        // テスト項目: 閾値ちょうどはアクティブ、閾値を超えると非アクティブと判定される
        // given (前提条件):
        let policy = PresencePolicy::default();
        let last_seen = Timestamp::new(1_000);

        // when (操作):
        let at_threshold = policy.is_stale(last_seen, Timestamp::new(31_000));
        let past_threshold = policy.is_stale(last_seen, Timestamp::new(31_001));

        // then (期待する結果):
        assert!(!at_threshold);
        assert!(past_threshold);
    }

    #[test]
    fn test_sweep_marks_only_stale_participants() {
        // テスト項目: スイープは閾値を超えた参加者のみを非アクティブにする
        // given (前提条件):
        let policy = PresencePolicy::default();
        let mut room = room_with(&["alice", "bob"], 1_000);
        record_heartbeat(&mut room, &pid("bob"), Timestamp::new(20_000));

        // when (操作):
        let changed = sweep(&mut room, Timestamp::new(40_000), &policy);

        // then (期待する結果):
        assert_eq!(changed, vec![pid("alice")]);
        assert!(!room.participant(&pid("alice")).unwrap().is_active);
        assert!(room.participant(&pid("bob")).unwrap().is_active);
        assert_eq!(room.participants.len(), 2);
    }

    #[test]
    fn test_sweep_reports_each_transition_once() {
        // テスト項目: 既に非アクティブな参加者は再度報告されない
        // given (前提条件):
        let policy = PresencePolicy::default();
        let mut room = room_with(&["alice"], 1_000);
        sweep(&mut room, Timestamp::new(40_000), &policy);

        // when (操作):
        let changed = sweep(&mut room, Timestamp::new(80_000), &policy);

        // then (期待する結果):
        assert!(changed.is_empty());
    }

    #[test]
    fn test_heartbeat_reactivates_without_waiting_for_sweep() {
        // テスト項目: ハートビートで即座にアクティブへ戻る
        // given (前提条件):
        let policy = PresencePolicy::default();
        let mut room = room_with(&["alice"], 1_000);
        sweep(&mut room, Timestamp::new(40_000), &policy);

        // when (操作):
        let outcome = record_heartbeat(&mut room, &pid("alice"), Timestamp::new(41_000));

        // then (期待する結果):
        assert_eq!(outcome, HeartbeatOutcome::Reactivated);
        let alice = room.participant(&pid("alice")).unwrap();
        assert!(alice.is_active);
        assert_eq!(alice.last_seen, Timestamp::new(41_000));
        assert_eq!(room.last_update, Timestamp::new(41_000));
    }

    #[test]
    fn test_heartbeat_for_unknown_participant() {
        // テスト項目: 存在しない参加者のハートビートは何も変更しない
        // given (前提条件):
        let mut room = room_with(&["alice"], 1_000);
        let before = room.clone();

        // when (操作):
        let outcome = record_heartbeat(&mut room, &pid("ghost"), Timestamp::new(2_000));

        // then (期待する結果):
        assert_eq!(outcome, HeartbeatOutcome::UnknownParticipant);
        assert_eq!(room, before);
    }

    #[test]
    fn test_custom_threshold_is_respected() {
        // テスト項目: 閾値を設定で変更できる
        // given (前提条件):
        let policy = PresencePolicy::new(Duration::from_secs(15), Duration::from_secs(1));
        let mut room = room_with(&["alice"], 1_000);

        // when (操作):
        let changed = sweep(&mut room, Timestamp::new(16_001), &policy);

        // then (期待する結果):
        assert_eq!(changed, vec![pid("alice")]);
    }
}
