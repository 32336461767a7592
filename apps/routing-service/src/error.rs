//! # Routing Service エラー定義
//!
//! ワークフローエンジンのエラーと、HTTP レスポンスへの変換を定義する。
//!
//! ## HTTP ステータスの対応
//!
//! | エラー | HTTP ステータス | `type` の末尾 |
//! |--------|----------------|---------------|
//! | `WorkflowNotFound` | 404 | `not-found` |
//! | `ConcurrentModification` | 409 | `concurrent-modification` |
//! | `StepAlreadyResolved` | 409 | `step-already-resolved` |
//! | `UnknownActor` | 403 | `unknown-actor` |
//! | `ResendNotPermitted` | 403 | `resend-not-permitted` |
//! | `StepNotCurrent` | 422 | `step-not-current` |
//! | `InvalidResendTarget` / `NoBypassedRecipients` | 422 | `invalid-resend-target` |
//! | `UnsupportedOperation` | 422 | `unsupported-operation` |
//! | `EmptyRecipientList` / `DuplicateRecipient` / `Validation` | 400 | `validation-error` |
//! | `InvariantViolation` / `Persistence` | 500 | `internal-error` |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use docflow_domain::{DomainError, workflow::WorkflowId};
use docflow_infra::InfraError;
use docflow_shared::{ErrorResponse, event_log::error};
use thiserror::Error;

/// ワークフローエンジンで発生するエラー
///
/// すべて呼び出し元に返す。エンジン内部ではリトライしない。
#[derive(Debug, Error)]
pub enum EngineError {
    /// 指定したワークフローが存在しない
    #[error("ワークフローが見つかりません: {0}")]
    WorkflowNotFound(WorkflowId),

    /// 読み込み後に他の操作がワークフローを更新した
    ///
    /// 呼び出し元は最新の状態を読み直してから再試行するか判断する。
    #[error("ワークフローは他の操作によって更新されました: {0}")]
    ConcurrentModification(WorkflowId),

    /// ドキュメントストアの障害
    #[error("永続化エラー: {0}")]
    Persistence(#[source] InfraError),

    /// 回付ルール上の拒否
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl EngineError {
    /// ストアのエラーを変換する（バージョン不一致は同時更新エラー）
    pub(crate) fn from_store(workflow_id: &WorkflowId, e: InfraError) -> Self {
        if e.is_conflict() {
            Self::ConcurrentModification(workflow_id.clone())
        } else {
            Self::Persistence(e)
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        match self {
            Self::WorkflowNotFound(_) => ErrorResponse::not_found(self.to_string()),
            Self::ConcurrentModification(_) => {
                ErrorResponse::conflict("concurrent-modification", self.to_string())
            }
            Self::Persistence(e) => {
                tracing::error!(
                    error.category = error::category::INFRASTRUCTURE,
                    error.kind = error::kind::PERSISTENCE,
                    "ドキュメントストアのエラー: {:?}",
                    e
                );
                ErrorResponse::internal_error()
            }
            Self::Domain(e) => domain_error_response(e),
        }
    }
}

fn domain_error_response(e: &DomainError) -> ErrorResponse {
    let detail = e.to_string();
    match e {
        DomainError::StepAlreadyResolved { .. } => {
            ErrorResponse::conflict("step-already-resolved", detail)
        }
        DomainError::UnknownActor { .. } => ErrorResponse::forbidden("unknown-actor", detail),
        DomainError::ResendNotPermitted { .. } => {
            ErrorResponse::forbidden("resend-not-permitted", detail)
        }
        DomainError::StepNotCurrent { .. } => {
            ErrorResponse::unprocessable("step-not-current", detail)
        }
        DomainError::InvalidResendTarget { .. } | DomainError::NoBypassedRecipients => {
            ErrorResponse::unprocessable("invalid-resend-target", detail)
        }
        DomainError::UnsupportedOperation(_) => {
            ErrorResponse::unprocessable("unsupported-operation", detail)
        }
        DomainError::EmptyRecipientList
        | DomainError::DuplicateRecipient { .. }
        | DomainError::Validation(_) => ErrorResponse::validation_error(detail),
        DomainError::InvariantViolation(_) => {
            tracing::error!(
                error.category = error::category::DOMAIN,
                error.kind = error::kind::INVARIANT,
                "不変条件違反: {}",
                detail
            );
            ErrorResponse::internal_error()
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let body = self.to_error_response();
        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
