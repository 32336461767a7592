//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、回付の判定はエンジンとドメイン層に委譲

pub mod event;
pub mod health;
pub mod workflow;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
pub use event::stream_events;
pub use health::health_check;
pub use workflow::{
    WorkflowState,
    apply_action,
    get_workflow,
    list_actor_workflows,
    list_submitted_workflows,
    resend,
    resend_all,
    submit_workflow,
};

/// 全エンドポイントのルーターを構築する
pub fn router(state: Arc<WorkflowState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/internal/events", get(stream_events))
        .route("/internal/workflows", post(submit_workflow))
        .route("/internal/workflows/{id}", get(get_workflow))
        .route("/internal/workflows/{id}/actions", post(apply_action))
        .route("/internal/workflows/{id}/resend", post(resend))
        .route("/internal/workflows/{id}/resend-all", post(resend_all))
        .route("/internal/actors/{id}/workflows", get(list_actor_workflows))
        .route(
            "/internal/actors/{id}/submissions",
            get(list_submitted_workflows),
        )
        .with_state(state)
}
