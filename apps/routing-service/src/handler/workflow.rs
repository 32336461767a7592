//! # ワークフロー API ハンドラ
//!
//! Routing Service のワークフロー関連エンドポイントを実装する。
//!
//! 操作者の ID はリクエストボディで受け取る（内部 API）。認証は前段のゲートウェイの責務。

mod command;
mod query;

pub use command::{apply_action, resend, resend_all, submit_workflow};
use docflow_domain::workflow::{ActionKind, RoutingType, Step, Workflow};
use docflow_infra::event_sink::BroadcastEventSink;
pub use query::{get_workflow, list_actor_workflows, list_submitted_workflows};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::usecase::WorkflowEngine;

/// 承認者の指定
#[derive(Debug, Deserialize)]
pub struct RecipientRequest {
    pub actor_id:  Uuid,
    /// 役割ラベル（例: "HOD Review"）
    pub step_name: String,
}

/// ワークフロー申請リクエスト
#[derive(Debug, Deserialize)]
pub struct SubmitWorkflowRequest {
    pub title:        String,
    pub submitted_by: Uuid,
    /// 指定順の承認者
    pub recipients:   Vec<RecipientRequest>,
    pub routing_type: RoutingType,
    #[serde(default)]
    pub has_bypass:   bool,
}

/// 承認・却下リクエスト
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub actor_id: Uuid,
    pub kind:     ActionKind,
    /// コメント（任意）
    pub comment:  Option<String>,
}

/// 再送リクエスト
#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    /// 再送を指示するアクター（申請者）
    pub actor_id: Uuid,
    /// 再送先の承認者
    pub target:   Uuid,
}

/// 一括再送リクエスト
#[derive(Debug, Deserialize)]
pub struct ResendAllRequest {
    pub actor_id: Uuid,
}

/// アクター別一覧のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    /// `true` の場合は判断待ちのワークフローだけを返す
    #[serde(default)]
    pub pending: bool,
}

/// ステップ DTO
#[derive(Debug, Serialize, Deserialize)]
pub struct StepDto {
    pub kind:         String,
    pub name:         String,
    pub assignee:     String,
    pub status:       String,
    pub actioned_by:  Option<String>,
    pub actioned_at:  Option<String>,
    pub comment:      Option<String>,
    pub resend_count: u32,
}

impl From<&Step> for StepDto {
    fn from(step: &Step) -> Self {
        Self {
            kind:         step.kind().to_string(),
            name:         step.name().to_string(),
            assignee:     step.assignee().to_string(),
            status:       step.status().to_string(),
            actioned_by:  step.actioned_by().map(|a| a.to_string()),
            actioned_at:  step.actioned_at().map(|t| t.to_rfc3339()),
            comment:      step.comment().map(|s| s.to_string()),
            resend_count: step.resend_count(),
        }
    }
}

/// ワークフロー DTO
///
/// `progress` と `current_stage` はステップから導出した値。
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkflowDto {
    pub id: String,
    pub title: String,
    pub submitted_by: String,
    pub routing_type: String,
    pub has_bypass: bool,
    pub status: String,
    pub progress: u8,
    pub current_stage: String,
    pub steps: Vec<StepDto>,
    pub bypassed_recipients: Vec<String>,
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Workflow> for WorkflowDto {
    fn from(workflow: &Workflow) -> Self {
        let progress = workflow.progress();
        Self {
            id: workflow.id().to_string(),
            title: workflow.title().to_string(),
            submitted_by: workflow.submitted_by().to_string(),
            routing_type: workflow.routing_type().to_string(),
            has_bypass: workflow.has_bypass(),
            status: workflow.status().to_string(),
            progress: progress.percent,
            current_stage: progress.stage.to_string(),
            steps: workflow.steps().iter().map(StepDto::from).collect(),
            bypassed_recipients: workflow
                .bypassed_recipients()
                .into_iter()
                .map(|a| a.to_string())
                .collect(),
            version: workflow.version().as_u64(),
            created_at: workflow.created_at().to_rfc3339(),
            updated_at: workflow.updated_at().to_rfc3339(),
        }
    }
}

/// ワークフローハンドラーの State
pub struct WorkflowState {
    pub engine: WorkflowEngine,
    /// UI 更新用のイベント購読元（エンジンの配信先と同じチャネル）
    pub events: BroadcastEventSink,
}
