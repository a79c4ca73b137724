//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID + Phantom Type
//! リード・チーム・イベント・タイマーの ID はすべて ULID です。
//! `Id<T>` というジェネリック型で共通実装を提供し、`T` はマーカー型として
//! コンパイル時に種類の取り違えを防ぎます（`LeadId` と `TeamId` は混同できない）。
//!
//! Display は `lead-01H...` のようにプレフィックス付き。パースはプレフィックスの
//! 有無どちらも受け付けます（外部層から素の ULID 文字列が渡されることがあるため）。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"lead-", "team-", ...）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は PhantomData なので実行時のサイズは ULID と同じ 16 bytes です。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// ULID から Id を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 新しいランダム ID（時刻は現在時刻）
    ///
    /// 本番の採番は `IdGenerator` を通すこと。これはテストや外部エンティティの
    /// 仮 ID 用です。
    pub fn random() -> Self {
        Self::from_ulid(Ulid::new())
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// IdParseError は ID 文字列のパース失敗
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id '{input}'")]
pub struct IdParseError {
    pub kind: &'static str,
    pub input: String,
}

impl<T: IdMarker> FromStr for Id<T> {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(T::prefix()).unwrap_or(s);
        Ulid::from_string(raw)
            .map(Self::from_ulid)
            .map_err(|_| IdParseError {
                kind: T::prefix().trim_end_matches('-'),
                input: s.to_string(),
            })
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Lead のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LeadMark {}

impl IdMarker for LeadMark {
    fn prefix() -> &'static str {
        "lead-"
    }
}

/// Team のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TeamMark {}

impl IdMarker for TeamMark {
    fn prefix() -> &'static str {
        "team-"
    }
}

/// LeadEvent のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventMark {}

impl IdMarker for EventMark {
    fn prefix() -> &'static str {
        "lev-"
    }
}

/// LeadTimer のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerMark {}

impl IdMarker for TimerMark {
    fn prefix() -> &'static str {
        "ltm-"
    }
}

// ========================================
// Type Alias
// ========================================

/// Identifier of a Lead (owned by the lead store, referenced here).
pub type LeadId = Id<LeadMark>;

/// Identifier of the Team a lead belongs to (tenant scope).
pub type TeamId = Id<TeamMark>;

/// Identifier of an immutable LeadEvent.
pub type LeadEventId = Id<EventMark>;

/// Identifier of a scheduled LeadTimer.
pub type LeadTimerId = Id<TimerMark>;
