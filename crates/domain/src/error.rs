//! # ドメイン層エラー定義
//!
//! 承認ルーティングの状態遷移で発生するエラーを表現する。
//!
//! ## 設計方針
//!
//! - **呼び出し元が区別できること**: 「既に処理済み」と「担当者ではない」は UI で
//!   出し分けるため、別々のバリアントにする
//! - **握りつぶさない**: すべて呼び出し元に返す。リトライするかどうかは呼び出し元が決める
//! - **thiserror 活用**: `#[error(...)]` でメッセージを定義する
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `UnknownActor` | 403 Forbidden | 操作者がどのステップの担当者でもない |
//! | `ResendNotPermitted` | 403 Forbidden | 申請者以外による再送 |
//! | `StepAlreadyResolved` | 409 Conflict | 処理済みステップへの再操作（重複リトライ含む） |
//! | `StepNotCurrent` | 422 Unprocessable Entity | 順次回付でまだ順番が来ていない |
//! | `InvalidResendTarget` / `NoBypassedRecipients` | 422 Unprocessable Entity | バイパス以外のステップへの再送 |
//! | `UnsupportedOperation` | 422 Unprocessable Entity | 回付方式が対応していない操作 |
//! | `EmptyRecipientList` / `DuplicateRecipient` / `Validation` | 400 Bad Request | 入力不正 |
//! | `InvariantViolation` | 500 Internal Server Error | 実装バグ |
//!
//! ## 使用例
//!
//! ```rust
//! use docflow_domain::{DomainError, actor::ActorId};
//!
//! let actor_id = ActorId::new();
//! let error = DomainError::UnknownActor { actor_id };
//! assert!(error.to_string().starts_with("このワークフローの承認者ではありません"));
//! ```

use thiserror::Error;

use crate::{actor::ActorId, workflow::StepStatus};

/// ドメイン層で発生するエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// 操作者がどの Current/Pending ステップの担当者とも一致しない
    ///
    /// 担当者の照合は ID の完全一致のみで行う。表示名や役職の部分一致は使わない。
    #[error("このワークフローの承認者ではありません: {actor_id}")]
    UnknownActor {
        /// 操作を試みたアクター
        actor_id: ActorId,
    },

    /// 対象ステップが既に終端状態
    ///
    /// 同じ操作の重複送信や、並行操作で後からコミットしようとした側に返る。
    /// 黙って成功扱いにはしない。
    #[error("ステップは既に処理済みです: {assignee}（{status}）")]
    StepAlreadyResolved {
        /// ステップの担当者
        assignee: ActorId,
        /// 現在の（終端）ステータス
        status:   StepStatus,
    },

    /// 順次回付で、担当ステップがまだ Pending
    #[error("まだ回付されていないステップです: {assignee}")]
    StepNotCurrent {
        /// ステップの担当者
        assignee: ActorId,
    },

    /// バイパスされていないステップへの再送
    #[error("再送できるのはバイパスされたステップのみです: {assignee}（{status}）")]
    InvalidResendTarget {
        /// 再送先として指定された担当者
        assignee: ActorId,
        /// 対象ステップの現在のステータス
        status:   StepStatus,
    },

    /// 一括再送の対象となるバイパスされた承認者がいない
    #[error("バイパスされた承認者がいません")]
    NoBypassedRecipients,

    /// 回付方式がサポートしていない操作
    ///
    /// 例: 双方向以外での再送、順次回付でのバイパス指定
    #[error("サポートされていない操作です: {0}")]
    UnsupportedOperation(String),

    /// 承認者が 1 人も指定されていない
    #[error("承認者が指定されていません")]
    EmptyRecipientList,

    /// 同じアクターが複数回指定された
    #[error("承認者が重複しています: {actor_id}")]
    DuplicateRecipient {
        /// 重複したアクター
        actor_id: ActorId,
    },

    /// 申請者以外による再送
    #[error("再送は申請者のみ実行できます: {actor_id}")]
    ResendNotPermitted {
        /// 再送を試みたアクター
        actor_id: ActorId,
    },

    /// 状態遷移後の不変条件チェックに失敗した
    #[error("不変条件違反: {0}")]
    InvariantViolation(String),

    /// 入力値の検証失敗
    #[error("バリデーションエラー: {0}")]
    Validation(String),
}
