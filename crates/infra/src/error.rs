//! # インフラ層エラー定義
//!
//! ドキュメントストア・イベント配信・アクターディレクトリで発生するエラーを表現する。
//!
//! ## 設計方針
//!
//! - **種別と呼び出し経路を分ける**: [`InfraError`] は種別（[`InfraErrorKind`]）と
//!   生成時点の [`SpanTrace`] を持つ。`std::io::Error` と同じ struct + enum の形
//! - **SpanTrace は生成時に捕捉する**: コンストラクタと `From` 実装の中で捕捉するので、
//!   呼び出し側は `?` で返すだけでよい
//! - **同時更新は専用の種別**: ユースケース層は [`InfraError::is_conflict`] だけで
//!   同時更新エラーへの変換を判断する

use std::fmt;

use derive_more::Display;
use docflow_domain::{value_objects::Version, workflow::WorkflowId};
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// 楽観的ロック競合
    ///
    /// 読み込んだ後に他の操作がワークフローを保存していた。
    #[error("ワークフロー {workflow_id} のバージョンが一致しません（期待: {expected}, 実際: {actual}）")]
    VersionConflict {
        workflow_id: WorkflowId,
        expected:    Version,
        actual:      Version,
    },

    /// 同じ ID のワークフローが既に保存されている
    #[error("ワークフローは既に存在します: {0}")]
    AlreadyExists(WorkflowId),

    /// 更新対象のワークフローが保存されていない
    #[error("ワークフローが保存されていません: {0}")]
    Missing(WorkflowId),

    #[error("シリアライズエラー: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("I/O エラー: {0}")]
    Io(#[source] std::io::Error),

    /// アクターディレクトリのシードデータが不正
    #[error("シードデータが不正です: {0}")]
    InvalidSeed(String),

    /// イベント配信エラー
    ///
    /// 配信に失敗したイベントはアウトボックスに残り、次回の flush で再送される。
    #[error("イベント配信エラー: {0}")]
    EventDelivery(String),

    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

impl InfraError {
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.kind, InfraErrorKind::VersionConflict { .. })
    }

    pub fn version_conflict(workflow_id: WorkflowId, expected: Version, actual: Version) -> Self {
        Self::capture(InfraErrorKind::VersionConflict {
            workflow_id,
            expected,
            actual,
        })
    }

    pub fn already_exists(workflow_id: WorkflowId) -> Self {
        Self::capture(InfraErrorKind::AlreadyExists(workflow_id))
    }

    pub fn missing(workflow_id: WorkflowId) -> Self {
        Self::capture(InfraErrorKind::Missing(workflow_id))
    }

    pub fn invalid_seed(msg: impl Into<String>) -> Self {
        Self::capture(InfraErrorKind::InvalidSeed(msg.into()))
    }

    pub fn event_delivery(msg: impl Into<String>) -> Self {
        Self::capture(InfraErrorKind::EventDelivery(msg.into()))
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::capture(InfraErrorKind::Unexpected(msg.into()))
    }

    fn capture(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(source: serde_json::Error) -> Self {
        Self::capture(InfraErrorKind::Serialization(source))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(source: std::io::Error) -> Self {
        Self::capture(InfraErrorKind::Io(source))
    }
}
