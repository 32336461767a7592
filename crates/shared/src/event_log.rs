//! # ビジネスイベントログとエラーコンテキストの構造化ヘルパー
//!
//! `jq` で調査しやすいよう、ログフィールドの命名規約とヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"` マーカーが
//! 自動付与され、`jq 'select(.["event.kind"] == "business_event")'` でフィルタできる。
//!
//! ## エラーコンテキスト
//!
//! `tracing::error!` に `error.category` + `error.kind` フィールドを直接追加する。
//! 定数は [`error`] モジュールで提供。
//!
//! ## フィールド命名規約
//!
//! ドット記法（`event.category`、`error.kind`）を使用。tracing の
//! `$($field:ident).+` パターンでサポートされ、JSON 出力でフラットなキーになる。

/// ビジネスイベントを構造化ログとして出力する。
///
/// `event.kind = "business_event"` マーカーを自動付与し、
/// `tracing::info!` レベルで出力する。呼び出し側のクレートは `tracing` に依存している必要がある。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: イベントカテゴリ（[`event::category`] の定数を使用）
/// - `event.action`: アクション名（[`event::action`] の定数を使用）
/// - `event.result`: 結果（[`event::result`] の定数を使用）
///
/// ## 推奨フィールド
///
/// - `event.entity_type`: エンティティ種別（[`event::entity_type`] の定数を使用）
/// - `event.entity_id`: エンティティ ID
/// - `event.actor_id`: 操作者 ID
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const WORKFLOW: &str = "workflow";
        pub const DELIVERY: &str = "delivery";
    }

    /// イベントアクション
    pub mod action {
        // ワークフロー
        pub const WORKFLOW_SUBMITTED: &str = "workflow.submitted";
        pub const WORKFLOW_COMPLETED: &str = "workflow.completed";
        pub const STEP_ACTIVATED: &str = "step.activated";
        pub const STEP_APPROVED: &str = "step.approved";
        pub const STEP_REJECTED: &str = "step.rejected";
        pub const STEP_BYPASSED: &str = "step.bypassed";
        pub const STEP_RESENT: &str = "step.resent";

        // イベント配信
        pub const OUTBOX_FLUSHED: &str = "outbox.flushed";
        pub const OUTBOX_DELIVERY_FAILED: &str = "outbox.delivery_failed";
        pub const OUTBOX_DEAD_LETTERED: &str = "outbox.dead_lettered";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const WORKFLOW: &str = "workflow";
        pub const STEP: &str = "step";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// インフラストラクチャ（ドキュメントストア、イベント配信）
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// ドメインの不変条件違反
        pub const DOMAIN: &str = "domain";
    }

    /// エラー種別
    pub mod kind {
        pub const PERSISTENCE: &str = "persistence";
        pub const EVENT_DELIVERY: &str = "event_delivery";
        pub const INVARIANT: &str = "invariant";
    }
}
