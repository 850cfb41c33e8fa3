//! 値オブジェクト（Value Object）
//!
//! ルーム ID・参加者 ID・タイムスタンプ・表示色など、
//! 不変条件をコンストラクタで検証する型を定義します。

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ValueObjectError;

/// Maximum length (in characters) of room and participant identifiers.
pub const MAX_ID_LENGTH: usize = 128;

/// Display colors a participant can be assigned at join.
pub const COLOR_PALETTE: [&str; 8] = [
    "#3B82F6", "#EF4444", "#10B981", "#F59E0B", "#8B5CF6", "#EC4899", "#06B6D4", "#84CC16",
];

fn validate_id(
    value: &str,
    empty: ValueObjectError,
    too_long: ValueObjectError,
) -> Result<(), ValueObjectError> {
    if value.trim().is_empty() {
        return Err(empty);
    }
    if value.chars().count() > MAX_ID_LENGTH {
        return Err(too_long);
    }
    Ok(())
}

/// ルームを識別する不透明なキー
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_id(
            &value,
            ValueObjectError::EmptyRoomId,
            ValueObjectError::RoomIdTooLong(MAX_ID_LENGTH),
        )?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 参加者 ID（ブラウジングセッションの間は安定）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_id(
            &value,
            ValueObjectError::EmptyParticipantId,
            ValueObjectError::ParticipantIdTooLong(MAX_ID_LENGTH),
        )?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unix タイムスタンプ（ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self` (negative if `earlier` is later).
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// 参加者の表示色（固定パレットのいずれか）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Assign a palette color at join time.
    ///
    /// The requested color is kept when it is part of the palette (case-insensitive);
    /// otherwise the color is picked by join order.
    pub fn assign(requested: Option<&str>, join_index: usize) -> Self {
        if let Some(requested) = requested
            && let Some(found) = COLOR_PALETTE
                .iter()
                .find(|candidate| candidate.eq_ignore_ascii_case(requested.trim()))
        {
            return Self((*found).to_string());
        }
        Self(COLOR_PALETTE[join_index % COLOR_PALETTE.len()].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
