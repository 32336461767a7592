//! # 共通値オブジェクト
//!
//! ## 含まれる型
//!
//! | 型 | ラップ対象 | 用途 |
//! |---|-----------|------|
//! | [`Version`] | `u64` | 楽観的ロック用のバージョン番号 |
//! | [`StepName`] | `String` | ステップの役割ラベル（例: "HOD Review"） |
//! | [`DocumentTitle`] | `String` | 申請文書のタイトル |
//! | [`DisplayName`] | `String` | アクターの表示名（PII） |

use serde::{Deserialize, Serialize};

use crate::DomainError;

// =========================================================================
// Version（バージョン番号）
// =========================================================================

/// 楽観的ロック用のバージョン番号
///
/// ワークフローの保存に成功するたびに 1 つ進む。ドキュメントストアは保存時に
/// 期待バージョンと比較し、一致しなければ競合として拒否する。
///
/// ```rust
/// use docflow_domain::value_objects::Version;
///
/// let v1 = Version::initial();
/// assert_eq!(v1.next().as_u64(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    pub fn initial() -> Self {
        Self(1)
    }

    /// 既存の値から復元する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 0 を指定した場合
    pub fn new(value: u64) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::Validation(
                "バージョン番号は 1 以上である必要があります".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// =========================================================================
// 文字列値オブジェクト
// =========================================================================

define_validated_string! {
    /// ステップ名（役割ラベル）
    pub struct StepName {
        label: "ステップ名",
        max_length: 100,
    }
}

impl StepName {
    /// 申請ステップ（擬似ステップ）の名前
    pub const SUBMISSION: &'static str = "Submission";

    pub fn submission() -> Self {
        Self(Self::SUBMISSION.to_string())
    }
}

define_validated_string! {
    /// 申請文書のタイトル
    pub struct DocumentTitle {
        label: "文書タイトル",
        max_length: 200,
    }
}

define_validated_string! {
    /// アクターの表示名
    pub struct DisplayName {
        label: "表示名",
        max_length: 100,
        redact_debug,
    }
}
