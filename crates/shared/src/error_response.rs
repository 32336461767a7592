//! # エラーレスポンス（RFC 9457 Problem Details）
//!
//! `type` は `https://docflow.example.com/errors/{problem}` の形の URI で、
//! クライアントはステータスコードではなくこの値で処理を分岐する。
//! 同じ 409 でも「処理済み」と「同時更新」では UI の案内が異なるため。
//!
//! axum の `IntoResponse` 変換は各サービスが行う（shared は axum に依存しない）。

use serde::{Deserialize, Serialize};

/// `type` URI のベースパス
pub const ERROR_TYPE_BASE: &str = "https://docflow.example.com/errors";

/// エラーレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
}

impl ErrorResponse {
    /// `problem` はベース URI に付加される（例: `"step-already-resolved"`）
    pub fn new(
        problem: &str,
        title: impl Into<String>,
        status: u16,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            error_type: format!("{ERROR_TYPE_BASE}/{problem}"),
            title: title.into(),
            status,
            detail: detail.into(),
        }
    }

    pub fn validation_error(detail: impl Into<String>) -> Self {
        Self::new("validation-error", "Validation Error", 400, detail)
    }

    pub fn forbidden(problem: &str, detail: impl Into<String>) -> Self {
        Self::new(problem, "Forbidden", 403, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new("not-found", "Not Found", 404, detail)
    }

    pub fn conflict(problem: &str, detail: impl Into<String>) -> Self {
        Self::new(problem, "Conflict", 409, detail)
    }

    pub fn unprocessable(problem: &str, detail: impl Into<String>) -> Self {
        Self::new(problem, "Unprocessable Entity", 422, detail)
    }

    /// 500 Internal Server Error
    ///
    /// detail は固定文言。原因はサーバー側のログにだけ残す。
    pub fn internal_error() -> Self {
        Self::new(
            "internal-error",
            "Internal Server Error",
            500,
            "内部エラーが発生しました",
        )
    }

    /// `type` URI の末尾（問題の識別子）
    pub fn problem(&self) -> &str {
        self.error_type
            .strip_prefix(ERROR_TYPE_BASE)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.error_type)
    }
}
