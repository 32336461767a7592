//! ビジネスイベントログへの配信
//!
//! ドメインイベントを `log_business_event!` で構造化ログとして出力する。
//! 監査ログの収集基盤はこのログを取り込む。

use async_trait::async_trait;
use docflow_domain::workflow::{ActionKind, WorkflowEvent};
use docflow_shared::{event_log::event, log_business_event};

use super::{EventEnvelope, EventSink};
use crate::error::InfraError;

/// ログ出力のみ行う配信先
#[derive(Debug, Clone, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// イベントに対応するログのアクション名とエンティティ種別
fn action_of(event: &WorkflowEvent) -> (&'static str, &'static str) {
    match event {
        WorkflowEvent::StepActivated { .. } => {
            (event::action::STEP_ACTIVATED, event::entity_type::STEP)
        }
        WorkflowEvent::StepResolved {
            kind: ActionKind::Approve,
            ..
        } => (event::action::STEP_APPROVED, event::entity_type::STEP),
        WorkflowEvent::StepResolved {
            kind: ActionKind::Reject,
            ..
        } => (event::action::STEP_REJECTED, event::entity_type::STEP),
        WorkflowEvent::StepBypassed { .. } => {
            (event::action::STEP_BYPASSED, event::entity_type::STEP)
        }
        WorkflowEvent::StepResent { .. } => (event::action::STEP_RESENT, event::entity_type::STEP),
        WorkflowEvent::WorkflowCompleted { .. } => (
            event::action::WORKFLOW_COMPLETED,
            event::entity_type::WORKFLOW,
        ),
    }
}

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), InfraError> {
        let (action, entity_type) = action_of(&envelope.event);
        let actor_id = envelope.event.step_assignee().map(ToString::to_string);
        let role = envelope.assignee.as_ref().map(|p| p.role.clone());

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = action,
            event.entity_type = entity_type,
            event.entity_id = %envelope.event.workflow_id(),
            event.actor_id = actor_id,
            event.actor_role = role,
            event.result = event::result::SUCCESS,
            timestamp = %envelope.event.timestamp(),
            "ワークフローイベント: {}",
            action
        );
        Ok(())
    }
}
