//! # ワークフロー
//!
//! 申請された 1 件の文書に対する承認ルーティングの状態を保持する集約。
//!
//! ステップ列とステータスは回付戦略の判定結果でのみ更新する。遷移は
//! consuming self で新しいインスタンスを返し、不変条件を満たさない結果は
//! 採用しない。

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::{
    Action,
    Progress,
    ProgressCalculator,
    RoutingStrategy,
    RoutingType,
    Step,
    StepStatus,
    WorkflowEvent,
    event::{activation_events, derive_events},
    invariant,
};
use crate::{
    DomainError,
    actor::ActorId,
    value_objects::{DocumentTitle, StepName, Version},
};

define_uuid_id! {
    /// ワークフロー ID
    pub struct WorkflowId;
}

/// ワークフローステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowStatus {
    /// 承認待ち
    Pending,
    /// 全員承認
    Approved,
    /// 却下（バイパスなし）
    Rejected,
    /// 全員が判断済みで、バイパスを含む
    PartiallyApproved,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "partially_approved" => Ok(Self::PartiallyApproved),
            _ => Err(DomainError::Validation(format!(
                "不正なワークフローステータス: {}",
                s
            ))),
        }
    }
}

/// 承認者の指定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub actor_id:  ActorId,
    pub step_name: StepName,
}

/// ワークフローの新規作成パラメータ
pub struct NewWorkflow {
    pub id: WorkflowId,
    pub title: DocumentTitle,
    pub submitted_by: ActorId,
    /// 申請者が指定した順の承認者
    pub recipients: Vec<Recipient>,
    pub routing_type: RoutingType,
    pub has_bypass: bool,
    pub now: DateTime<Utc>,
}

/// ワークフローの復元パラメータ
pub struct WorkflowRecord {
    pub id: WorkflowId,
    pub title: DocumentTitle,
    pub submitted_by: ActorId,
    pub routing_type: RoutingType,
    pub has_bypass: bool,
    pub steps: Vec<Step>,
    pub status: WorkflowStatus,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 状態遷移の結果
#[derive(Debug, Clone)]
pub struct Transition {
    pub workflow: Workflow,
    pub events:   Vec<WorkflowEvent>,
}

/// ワークフローエンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    id: WorkflowId,
    title: DocumentTitle,
    submitted_by: ActorId,
    routing_type: RoutingType,
    strategy: RoutingStrategy,
    steps: Vec<Step>,
    status: WorkflowStatus,
    version: Version,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Workflow {
    /// 文書を申請してワークフローを作成する
    ///
    /// 承認者の並びからステップ列を作り（逆順回付では反転）、最初の回付を行う。
    ///
    /// # Errors
    ///
    /// - `DomainError::EmptyRecipientList`: 承認者が指定されていない場合
    /// - `DomainError::DuplicateRecipient`: 同じアクターが複数回指定された場合
    /// - `DomainError::UnsupportedOperation`: 順次・逆順回付でバイパスを指定した場合
    pub fn submit(params: NewWorkflow) -> Result<Transition, DomainError> {
        if params.recipients.is_empty() {
            return Err(DomainError::EmptyRecipientList);
        }
        if let Some(actor_id) = params
            .recipients
            .iter()
            .map(|r| &r.actor_id)
            .duplicates()
            .next()
        {
            return Err(DomainError::DuplicateRecipient {
                actor_id: actor_id.clone(),
            });
        }

        let strategy = RoutingStrategy::select(params.routing_type, params.has_bypass)?;

        let reviews = params
            .routing_type
            .arrange(params.recipients)
            .into_iter()
            .map(|r| Step::review(r.step_name, r.actor_id));
        let steps = std::iter::once(Step::submission(params.submitted_by.clone(), params.now))
            .chain(reviews)
            .collect();
        let steps = strategy.initial_steps(steps)?;
        let status = strategy.derive_status(&steps);
        invariant::check(&strategy, &steps, status)?;

        let events = activation_events(&params.id, &steps, params.now);
        let workflow = Self {
            id: params.id,
            title: params.title,
            submitted_by: params.submitted_by,
            routing_type: params.routing_type,
            strategy,
            steps,
            status,
            version: Version::initial(),
            created_at: params.now,
            updated_at: params.now,
        };

        Ok(Transition { workflow, events })
    }

    /// 既存のデータから復元する
    ///
    /// # Errors
    ///
    /// - `DomainError::UnsupportedOperation`: 回付方式とバイパス指定の組み合わせが不正な場合
    /// - `DomainError::InvariantViolation`: ステップ列とステータスが不変条件を満たさない場合
    pub fn from_record(record: WorkflowRecord) -> Result<Self, DomainError> {
        let strategy = RoutingStrategy::select(record.routing_type, record.has_bypass)?;
        invariant::check(&strategy, &record.steps, record.status)?;

        Ok(Self {
            id: record.id,
            title: record.title,
            submitted_by: record.submitted_by,
            routing_type: record.routing_type,
            strategy,
            steps: record.steps,
            status: record.status,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    // Getter メソッド

    pub fn id(&self) -> &WorkflowId {
        &self.id
    }

    pub fn title(&self) -> &DocumentTitle {
        &self.title
    }

    pub fn submitted_by(&self) -> &ActorId {
        &self.submitted_by
    }

    pub fn routing_type(&self) -> RoutingType {
        self.routing_type
    }

    pub fn strategy(&self) -> RoutingStrategy {
        self.strategy
    }

    /// 双方向回付では常に `true`
    pub fn has_bypass(&self) -> bool {
        self.strategy.allows_bypass()
    }

    /// 申請ステップを先頭に含むステップ列
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // 派生値

    pub fn progress(&self) -> Progress {
        ProgressCalculator::calculate(&self.strategy, &self.steps, self.status)
    }

    /// 承認者ステップ（申請ステップを除く）
    pub fn recipient_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.is_review())
    }

    /// バイパスされた承認者
    pub fn bypassed_recipients(&self) -> Vec<&ActorId> {
        self.recipient_steps()
            .filter(|s| s.status() == StepStatus::Bypassed)
            .map(Step::assignee)
            .collect()
    }

    pub fn is_recipient(&self, actor_id: &ActorId) -> bool {
        self.recipient_steps().any(|s| s.assignee() == actor_id)
    }

    /// 指定したアクターの判断待ちステップがあるか
    pub fn is_awaiting(&self, actor_id: &ActorId) -> bool {
        self.recipient_steps()
            .any(|s| s.assignee() == actor_id && s.status() == StepStatus::Current)
    }

    // ビジネスロジックメソッド

    /// 承認・却下を適用する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 操作の対象が別のワークフローの場合
    /// - 回付戦略のエラー（[`RoutingStrategy::decide`] を参照）
    pub fn apply(self, action: &Action, now: DateTime<Utc>) -> Result<Transition, DomainError> {
        if action.workflow_id != self.id {
            return Err(DomainError::Validation(format!(
                "操作対象のワークフロー {} が {} と一致しません",
                action.workflow_id, self.id
            )));
        }

        let decision = self.strategy.decide(&self.steps, action, now)?;
        self.transitioned(decision.steps, decision.status, now)
    }

    /// バイパスされた承認者へ再送する
    ///
    /// 権限の確認を回付方式の確認より先に行う。
    ///
    /// # Errors
    ///
    /// - `DomainError::ResendNotPermitted`: 申請者以外が再送した場合
    /// - 回付戦略のエラー（[`RoutingStrategy::resend`] を参照）
    pub fn resend(
        self,
        requested_by: &ActorId,
        target: &ActorId,
        now: DateTime<Utc>,
    ) -> Result<Transition, DomainError> {
        self.ensure_submitter(requested_by)?;

        let decision = self.strategy.resend(&self.steps, target)?;
        self.transitioned(decision.steps, decision.status, now)
    }

    /// バイパスされた全承認者へ再送する
    ///
    /// # Errors
    ///
    /// - `DomainError::ResendNotPermitted`: 申請者以外が再送した場合
    /// - 回付戦略のエラー（[`RoutingStrategy::resend_all`] を参照）
    pub fn resend_all(
        self,
        requested_by: &ActorId,
        now: DateTime<Utc>,
    ) -> Result<Transition, DomainError> {
        self.ensure_submitter(requested_by)?;

        let decision = self.strategy.resend_all(&self.steps)?;
        self.transitioned(decision.steps, decision.status, now)
    }

    fn ensure_submitter(&self, actor_id: &ActorId) -> Result<(), DomainError> {
        if actor_id != &self.submitted_by {
            return Err(DomainError::ResendNotPermitted {
                actor_id: actor_id.clone(),
            });
        }
        Ok(())
    }

    fn transitioned(
        self,
        steps: Vec<Step>,
        status: WorkflowStatus,
        now: DateTime<Utc>,
    ) -> Result<Transition, DomainError> {
        invariant::check_transition(&self.steps, &steps)?;
        invariant::check(&self.strategy, &steps, status)?;

        let events = derive_events(&self.id, (&self.steps, self.status), (&steps, status), now);
        let workflow = Self {
            steps,
            status,
            version: self.version.next(),
            updated_at: now,
            ..self
        };

        Ok(Transition { workflow, events })
    }
}
