//! ワークフローハンドラの照会操作

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use docflow_domain::{actor::ActorId, workflow::WorkflowId};
use docflow_shared::ApiResponse;
use uuid::Uuid;

use super::{InboxQuery, WorkflowDto, WorkflowState};
use crate::error::EngineError;

/// ワークフローを取得する
///
/// ## エンドポイント
/// GET /internal/workflows/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_workflow(
    State(state): State<Arc<WorkflowState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, EngineError> {
    let workflow = state.engine.get(&WorkflowId::from_uuid(id)).await?;

    let response = ApiResponse::new(WorkflowDto::from(&workflow));
    Ok(Json(response).into_response())
}

/// アクターが承認者として含まれるワークフロー一覧
///
/// ## エンドポイント
/// GET /internal/actors/{id}/workflows
///
/// `?pending=true` の場合は判断待ちのものだけを返す（受信箱）。
#[tracing::instrument(skip_all, fields(%id, pending = query.pending))]
pub async fn list_actor_workflows(
    State(state): State<Arc<WorkflowState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<InboxQuery>,
) -> Result<Response, EngineError> {
    let actor_id = ActorId::from_uuid(id);
    let workflows = if query.pending {
        state.engine.pending_for_actor(&actor_id).await?
    } else {
        state.engine.list_by_recipient(&actor_id).await?
    };

    let response = ApiResponse::new(workflows.iter().map(WorkflowDto::from).collect::<Vec<_>>());
    Ok(Json(response).into_response())
}

/// アクターが申請したワークフロー一覧
///
/// ## エンドポイント
/// GET /internal/actors/{id}/submissions
#[tracing::instrument(skip_all, fields(%id))]
pub async fn list_submitted_workflows(
    State(state): State<Arc<WorkflowState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, EngineError> {
    let workflows = state
        .engine
        .list_by_submitter(&ActorId::from_uuid(id))
        .await?;

    let response = ApiResponse::new(workflows.iter().map(WorkflowDto::from).collect::<Vec<_>>());
    Ok(Json(response).into_response())
}
