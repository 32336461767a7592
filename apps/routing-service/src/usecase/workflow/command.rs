//! ワークフローエンジンの状態変更操作

use docflow_domain::{
    actor::ActorId,
    workflow::{Action, NewWorkflow, StepStatus, Workflow, WorkflowId},
};
use docflow_shared::{event_log::event, log_business_event};

use super::{SubmitWorkflowInput, WorkflowEngine};
use crate::error::EngineError;

impl WorkflowEngine {
    /// 文書を申請してワークフローを作成する
    ///
    /// ## エラー
    ///
    /// - `EmptyRecipientList` / `DuplicateRecipient`: 承認者の指定が不正
    /// - `UnsupportedOperation`: 順次・逆順回付でバイパスを指定した
    /// - `Persistence`: ストアへの保存に失敗
    #[tracing::instrument(
        skip_all,
        fields(submitted_by = %input.submitted_by, routing_type = %input.routing_type)
    )]
    pub async fn submit(&self, input: SubmitWorkflowInput) -> Result<Workflow, EngineError> {
        let transition = Workflow::submit(NewWorkflow {
            id: WorkflowId::new(),
            title: input.title,
            submitted_by: input.submitted_by,
            recipients: input.recipients,
            routing_type: input.routing_type,
            has_bypass: input.has_bypass,
            now: self.clock.now(),
        })?;
        let workflow = transition.workflow;

        self.store
            .insert(&workflow)
            .await
            .map_err(|e| EngineError::from_store(workflow.id(), e))?;
        self.record(transition.events);

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::WORKFLOW_SUBMITTED,
            event.entity_type = event::entity_type::WORKFLOW,
            event.entity_id = %workflow.id(),
            event.actor_id = %workflow.submitted_by(),
            event.result = event::result::SUCCESS,
            recipients = workflow.recipient_steps().count(),
            "ワークフロー申請"
        );

        self.deliver().await;
        Ok(workflow)
    }

    /// 承認・却下を適用する
    ///
    /// 同じステップへの操作が競合した場合、先に保存された側が勝つ。
    /// プロセス内の競合はロックで直列化され、後続は `StepAlreadyResolved` を受け取る。
    /// 別プロセスとの競合は保存時のバージョン不一致で `ConcurrentModification` になる。
    #[tracing::instrument(
        skip_all,
        fields(%workflow_id, actor_id = %action.actor_id, kind = %action.kind)
    )]
    pub async fn apply(
        &self,
        workflow_id: &WorkflowId,
        action: &Action,
    ) -> Result<Workflow, EngineError> {
        let _guard = self.locks.acquire(workflow_id).await;

        let workflow = self.load(workflow_id).await?;
        let expected_version = workflow.version();
        let transition = workflow.apply(action, self.clock.now())?;
        self.save(&transition.workflow, expected_version).await?;
        self.record(transition.events);

        let workflow = transition.workflow;
        let resolved = workflow
            .recipient_steps()
            .find(|s| s.assignee() == &action.actor_id)
            .map(|s| s.status());
        let event_action = match resolved {
            Some(StepStatus::Completed) => event::action::STEP_APPROVED,
            Some(StepStatus::Bypassed) => event::action::STEP_BYPASSED,
            _ => event::action::STEP_REJECTED,
        };
        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event_action,
            event.entity_type = event::entity_type::STEP,
            event.entity_id = %workflow.id(),
            event.actor_id = %action.actor_id,
            event.result = event::result::SUCCESS,
            status = %workflow.status(),
            "承認操作を適用"
        );

        self.deliver().await;
        Ok(workflow)
    }

    /// バイパスされた承認者へ再送する（双方向回付のみ）
    ///
    /// ## エラー
    ///
    /// - `ResendNotPermitted`: 申請者以外が再送した
    /// - `UnsupportedOperation`: 双方向回付以外のワークフロー
    /// - `InvalidResendTarget`: 対象のステップが Bypassed ではない
    #[tracing::instrument(skip_all, fields(%workflow_id, actor_id = %requested_by, %target))]
    pub async fn resend(
        &self,
        workflow_id: &WorkflowId,
        requested_by: &ActorId,
        target: &ActorId,
    ) -> Result<Workflow, EngineError> {
        let _guard = self.locks.acquire(workflow_id).await;

        let workflow = self.load(workflow_id).await?;
        let expected_version = workflow.version();
        let transition = workflow.resend(requested_by, target, self.clock.now())?;
        self.save(&transition.workflow, expected_version).await?;
        self.record(transition.events);

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::STEP_RESENT,
            event.entity_type = event::entity_type::STEP,
            event.entity_id = %workflow_id,
            event.actor_id = %requested_by,
            event.result = event::result::SUCCESS,
            target = %target,
            "バイパスされた承認者へ再送"
        );

        self.deliver().await;
        Ok(transition.workflow)
    }

    /// バイパスされた全承認者へ再送する（双方向回付のみ）
    ///
    /// バイパスされた承認者がいない場合は `NoBypassedRecipients` を返す。
    #[tracing::instrument(skip_all, fields(%workflow_id, actor_id = %requested_by))]
    pub async fn resend_all(
        &self,
        workflow_id: &WorkflowId,
        requested_by: &ActorId,
    ) -> Result<Workflow, EngineError> {
        let _guard = self.locks.acquire(workflow_id).await;

        let workflow = self.load(workflow_id).await?;
        let expected_version = workflow.version();
        let resent = workflow.bypassed_recipients().len();
        let transition = workflow.resend_all(requested_by, self.clock.now())?;
        self.save(&transition.workflow, expected_version).await?;
        self.record(transition.events);

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::STEP_RESENT,
            event.entity_type = event::entity_type::WORKFLOW,
            event.entity_id = %workflow_id,
            event.actor_id = %requested_by,
            event.result = event::result::SUCCESS,
            resent,
            "バイパスされた全承認者へ再送"
        );

        self.deliver().await;
        Ok(transition.workflow)
    }
}
