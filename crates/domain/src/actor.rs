//! # アクター
//!
//! 申請者・承認者を表す識別子とプロフィール。
//!
//! ステップの担当者は常に [`ActorId`] で保持し、照合も ID の完全一致で行う。
//! 表示名や役職はイベントペイロードの表示用にアクターディレクトリから解決するだけで、
//! 判定には一切使わない。

use serde::{Deserialize, Serialize};

use crate::value_objects::DisplayName;

define_uuid_id! {
    /// アクター ID
    ///
    /// 申請者・承認者を一意に識別する安定した ID。
    pub struct ActorId;
}

/// アクターのプロフィール
///
/// アクターディレクトリが返す表示用情報。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorProfile {
    pub id:           ActorId,
    pub display_name: DisplayName,
    /// 役職ラベル（例: "HOD", "Principal"）
    pub role:         String,
}

impl ActorProfile {
    pub fn new(id: ActorId, display_name: DisplayName, role: impl Into<String>) -> Self {
        Self {
            id,
            display_name,
            role: role.into(),
        }
    }
}
