//! ワークフローハンドラの状態変更操作

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use docflow_domain::{
    actor::ActorId,
    value_objects::{DocumentTitle, StepName},
    workflow::{Action, Recipient, WorkflowId},
};
use docflow_shared::ApiResponse;
use uuid::Uuid;

use super::{
    ActionRequest,
    ResendAllRequest,
    ResendRequest,
    SubmitWorkflowRequest,
    WorkflowDto,
    WorkflowState,
};
use crate::{error::EngineError, usecase::SubmitWorkflowInput};

/// 文書を申請する
///
/// ## エンドポイント
/// POST /internal/workflows
///
/// ## 処理フロー
/// 1. タイトルとステップ名を検証
/// 2. エンジンを呼び出し
/// 3. 201 Created + 作成されたワークフローを返す
#[tracing::instrument(skip_all)]
pub async fn submit_workflow(
    State(state): State<Arc<WorkflowState>>,
    Json(req): Json<SubmitWorkflowRequest>,
) -> Result<Response, EngineError> {
    let recipients = req
        .recipients
        .into_iter()
        .map(|r| -> Result<Recipient, EngineError> {
            Ok(Recipient {
                actor_id:  ActorId::from_uuid(r.actor_id),
                step_name: StepName::new(r.step_name)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let input = SubmitWorkflowInput {
        title: DocumentTitle::new(req.title)?,
        submitted_by: ActorId::from_uuid(req.submitted_by),
        recipients,
        routing_type: req.routing_type,
        has_bypass: req.has_bypass,
    };

    let workflow = state.engine.submit(input).await?;

    let response = ApiResponse::new(WorkflowDto::from(&workflow));
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// 承認・却下する
///
/// ## エンドポイント
/// POST /internal/workflows/{id}/actions
#[tracing::instrument(skip_all, fields(%id))]
pub async fn apply_action(
    State(state): State<Arc<WorkflowState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ActionRequest>,
) -> Result<Response, EngineError> {
    let workflow_id = WorkflowId::from_uuid(id);
    let mut action = Action {
        workflow_id: workflow_id.clone(),
        actor_id:    ActorId::from_uuid(req.actor_id),
        kind:        req.kind,
        comment:     None,
    };
    if let Some(comment) = req.comment {
        action = action.with_comment(comment);
    }

    let workflow = state.engine.apply(&workflow_id, &action).await?;

    let response = ApiResponse::new(WorkflowDto::from(&workflow));
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// バイパスされた承認者へ再送する
///
/// ## エンドポイント
/// POST /internal/workflows/{id}/resend
#[tracing::instrument(skip_all, fields(%id))]
pub async fn resend(
    State(state): State<Arc<WorkflowState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResendRequest>,
) -> Result<Response, EngineError> {
    let workflow = state
        .engine
        .resend(
            &WorkflowId::from_uuid(id),
            &ActorId::from_uuid(req.actor_id),
            &ActorId::from_uuid(req.target),
        )
        .await?;

    let response = ApiResponse::new(WorkflowDto::from(&workflow));
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// バイパスされた全承認者へ再送する
///
/// ## エンドポイント
/// POST /internal/workflows/{id}/resend-all
#[tracing::instrument(skip_all, fields(%id))]
pub async fn resend_all(
    State(state): State<Arc<WorkflowState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResendAllRequest>,
) -> Result<Response, EngineError> {
    let workflow = state
        .engine
        .resend_all(
            &WorkflowId::from_uuid(id),
            &ActorId::from_uuid(req.actor_id),
        )
        .await?;

    let response = ApiResponse::new(WorkflowDto::from(&workflow));
    Ok((StatusCode::OK, Json(response)).into_response())
}
