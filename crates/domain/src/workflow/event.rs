//! # ドメインイベント
//!
//! 状態遷移の結果として外部（通知配信・監査ログ・UI 更新）に伝える事実。
//!
//! ## 配信保証
//!
//! 配信は at-least-once。購読側は [`WorkflowEvent::idempotency_key`]
//! （ワークフロー ID・担当者・イベント種別・時刻の組）で重複を除去する。
//!
//! ## イベントの導出
//!
//! イベントは遷移前後のステップ列を比較して導出する（[`derive_events`]）。
//! 遷移ロジック側でイベントを個別に組み立てないので、ステップの変化と
//! イベントが食い違うことがない。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::{ActionKind, Step, StepStatus, WorkflowId, WorkflowStatus};
use crate::{actor::ActorId, value_objects::StepName};

/// イベント種別
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    StepActivated,
    StepResolved,
    StepBypassed,
    StepResent,
    WorkflowCompleted,
}

/// ワークフローのドメインイベント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// ステップが判断待ちになった（承認依頼の通知契機）
    StepActivated {
        workflow_id:   WorkflowId,
        step_assignee: ActorId,
        step_name:     StepName,
        timestamp:     DateTime<Utc>,
    },
    /// 承認者が承認または却下した
    StepResolved {
        workflow_id:   WorkflowId,
        step_assignee: ActorId,
        kind:          ActionKind,
        comment:       Option<String>,
        timestamp:     DateTime<Utc>,
    },
    /// 却下がバイパスとして記録された
    StepBypassed {
        workflow_id:   WorkflowId,
        step_assignee: ActorId,
        timestamp:     DateTime<Utc>,
    },
    /// バイパスされた承認者へ再送された
    StepResent {
        workflow_id:   WorkflowId,
        step_assignee: ActorId,
        resend_count:  u32,
        timestamp:     DateTime<Utc>,
    },
    /// ワークフローが終端ステータスに到達した
    WorkflowCompleted {
        workflow_id:  WorkflowId,
        final_status: WorkflowStatus,
        timestamp:    DateTime<Utc>,
    },
}

/// 購読側が重複除去に使うキー
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IdempotencyKey {
    pub workflow_id:   WorkflowId,
    pub step_assignee: Option<ActorId>,
    pub kind:          EventKind,
    pub timestamp:     DateTime<Utc>,
}

impl WorkflowEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::StepActivated { .. } => EventKind::StepActivated,
            Self::StepResolved { .. } => EventKind::StepResolved,
            Self::StepBypassed { .. } => EventKind::StepBypassed,
            Self::StepResent { .. } => EventKind::StepResent,
            Self::WorkflowCompleted { .. } => EventKind::WorkflowCompleted,
        }
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        match self {
            Self::StepActivated { workflow_id, .. }
            | Self::StepResolved { workflow_id, .. }
            | Self::StepBypassed { workflow_id, .. }
            | Self::StepResent { workflow_id, .. }
            | Self::WorkflowCompleted { workflow_id, .. } => workflow_id,
        }
    }

    /// 対象ステップの担当者（ワークフロー単位のイベントでは `None`）
    pub fn step_assignee(&self) -> Option<&ActorId> {
        match self {
            Self::StepActivated { step_assignee, .. }
            | Self::StepResolved { step_assignee, .. }
            | Self::StepBypassed { step_assignee, .. }
            | Self::StepResent { step_assignee, .. } => Some(step_assignee),
            Self::WorkflowCompleted { .. } => None,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::StepActivated { timestamp, .. }
            | Self::StepResolved { timestamp, .. }
            | Self::StepBypassed { timestamp, .. }
            | Self::StepResent { timestamp, .. }
            | Self::WorkflowCompleted { timestamp, .. } => *timestamp,
        }
    }

    pub fn idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey {
            workflow_id:   self.workflow_id().clone(),
            step_assignee: self.step_assignee().cloned(),
            kind:          self.kind(),
            timestamp:     self.timestamp(),
        }
    }
}

/// 遷移前後のステップ列とステータスからイベントを導出する
///
/// ステップ順に、解決系（StepResolved / StepBypassed）→ 再送 → 回付の順で並べ、
/// 最後にワークフロー完了を置く。ステップ列は同じ並びである前提。
pub fn derive_events(
    workflow_id: &WorkflowId,
    before: (&[Step], WorkflowStatus),
    after: (&[Step], WorkflowStatus),
    now: DateTime<Utc>,
) -> Vec<WorkflowEvent> {
    let (before_steps, before_status) = before;
    let (after_steps, after_status) = after;

    let mut events: Vec<WorkflowEvent> = before_steps
        .iter()
        .zip(after_steps)
        .filter(|(prev, next)| prev.status() != next.status())
        .flat_map(|(prev, next)| step_events(workflow_id, prev.status(), next, now))
        .collect();

    if before_status != after_status && after_status.is_terminal() {
        events.push(WorkflowEvent::WorkflowCompleted {
            workflow_id:  workflow_id.clone(),
            final_status: after_status,
            timestamp:    now,
        });
    }

    events
}

/// 作成直後のワークフローで判断待ちになったステップのイベント
pub fn activation_events(
    workflow_id: &WorkflowId,
    steps: &[Step],
    now: DateTime<Utc>,
) -> Vec<WorkflowEvent> {
    steps
        .iter()
        .filter(|s| s.status() == StepStatus::Current)
        .map(|s| activated(workflow_id, s, now))
        .collect()
}

fn step_events(
    workflow_id: &WorkflowId,
    prev: StepStatus,
    next: &Step,
    now: DateTime<Utc>,
) -> Vec<WorkflowEvent> {
    let resolved = |kind| WorkflowEvent::StepResolved {
        workflow_id: workflow_id.clone(),
        step_assignee: next.assignee().clone(),
        kind,
        comment: next.comment().map(str::to_string),
        timestamp: now,
    };

    match (prev, next.status()) {
        (_, StepStatus::Completed) => vec![resolved(ActionKind::Approve)],
        (_, StepStatus::Rejected) => vec![resolved(ActionKind::Reject)],
        (_, StepStatus::Bypassed) => vec![
            resolved(ActionKind::Reject),
            WorkflowEvent::StepBypassed {
                workflow_id:   workflow_id.clone(),
                step_assignee: next.assignee().clone(),
                timestamp:     now,
            },
        ],
        (StepStatus::Bypassed, StepStatus::Current) => vec![
            WorkflowEvent::StepResent {
                workflow_id:   workflow_id.clone(),
                step_assignee: next.assignee().clone(),
                resend_count:  next.resend_count(),
                timestamp:     now,
            },
            activated(workflow_id, next, now),
        ],
        (_, StepStatus::Current) => vec![activated(workflow_id, next, now)],
        // 打ち切りはワークフロー完了イベントで伝わる
        _ => Vec::new(),
    }
}

fn activated(workflow_id: &WorkflowId, step: &Step, now: DateTime<Utc>) -> WorkflowEvent {
    WorkflowEvent::StepActivated {
        workflow_id:   workflow_id.clone(),
        step_assignee: step.assignee().clone(),
        step_name:     step.name().clone(),
        timestamp:     now,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::workflow::{Action, RoutingStrategy};

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn initial(strategy: RoutingStrategy, recipients: &[ActorId], now: DateTime<Utc>) -> Vec<Step> {
        let mut steps = vec![Step::submission(ActorId::new(), now)];
        steps.extend(
            recipients
                .iter()
                .map(|a| Step::review(StepName::new("Review").unwrap(), a.clone())),
        );
        strategy.initial_steps(steps).unwrap()
    }

    #[rstest]
    fn test_順次回付の承認で解決と次の回付が出る(now: DateTime<Utc>) {
        let wf = WorkflowId::new();
        let (a, b) = (ActorId::new(), ActorId::new());
        let strategy = RoutingStrategy::Sequential;
        let before = initial(strategy, &[a.clone(), b.clone()], now);
        let decision = strategy
            .decide(&before, &Action::approve(wf.clone(), a.clone()), now)
            .unwrap();

        let events = derive_events(
            &wf,
            (&before, WorkflowStatus::Pending),
            (&decision.steps, decision.status),
            now,
        );

        let kinds: Vec<EventKind> = events.iter().map(WorkflowEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::StepResolved, EventKind::StepActivated]);
        assert_eq!(events[0].step_assignee(), Some(&a));
        assert_eq!(events[1].step_assignee(), Some(&b));
    }

    #[rstest]
    fn test_バイパスでは解決とバイパスが出る(now: DateTime<Utc>) {
        let wf = WorkflowId::new();
        let (a, b) = (ActorId::new(), ActorId::new());
        let strategy = RoutingStrategy::Bidirectional;
        let before = initial(strategy, &[a, b.clone()], now);
        let decision = strategy
            .decide(&before, &Action::reject(wf.clone(), b.clone()), now)
            .unwrap();

        let events = derive_events(
            &wf,
            (&before, WorkflowStatus::Pending),
            (&decision.steps, decision.status),
            now,
        );

        assert_eq!(
            events,
            vec![
                WorkflowEvent::StepResolved {
                    workflow_id:   wf.clone(),
                    step_assignee: b.clone(),
                    kind:          ActionKind::Reject,
                    comment:       None,
                    timestamp:     now,
                },
                WorkflowEvent::StepBypassed {
                    workflow_id:   wf,
                    step_assignee: b,
                    timestamp:     now,
                },
            ]
        );
    }

    #[rstest]
    fn test_最後の承認で完了イベントが最後に出る(now: DateTime<Utc>) {
        let wf = WorkflowId::new();
        let a = ActorId::new();
        let strategy = RoutingStrategy::Parallel { bypass: false };
        let before = initial(strategy, std::slice::from_ref(&a), now);
        let decision = strategy
            .decide(&before, &Action::approve(wf.clone(), a), now)
            .unwrap();

        let events = derive_events(
            &wf,
            (&before, WorkflowStatus::Pending),
            (&decision.steps, decision.status),
            now,
        );

        assert_eq!(
            events.last(),
            Some(&WorkflowEvent::WorkflowCompleted {
                workflow_id:  wf,
                final_status: WorkflowStatus::Approved,
                timestamp:    now,
            })
        );
    }

    #[rstest]
    fn test_再送では再送と回付が出る(now: DateTime<Utc>) {
        let wf = WorkflowId::new();
        let a = ActorId::new();
        let strategy = RoutingStrategy::Bidirectional;
        let steps = initial(strategy, std::slice::from_ref(&a), now);
        let bypassed = strategy
            .decide(&steps, &Action::reject(wf.clone(), a.clone()), now)
            .unwrap();
        let resent = strategy.resend(&bypassed.steps, &a).unwrap();

        let events = derive_events(
            &wf,
            (&bypassed.steps, bypassed.status),
            (&resent.steps, resent.status),
            now,
        );

        let kinds: Vec<EventKind> = events.iter().map(WorkflowEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::StepResent, EventKind::StepActivated]);
    }

    #[rstest]
    fn test_冪等キーは担当者と種別と時刻で決まる(now: DateTime<Utc>) {
        let wf = WorkflowId::new();
        let a = ActorId::new();
        let event = WorkflowEvent::StepBypassed {
            workflow_id:   wf.clone(),
            step_assignee: a.clone(),
            timestamp:     now,
        };

        assert_eq!(
            event.idempotency_key(),
            IdempotencyKey {
                workflow_id:   wf,
                step_assignee: Some(a),
                kind:          EventKind::StepBypassed,
                timestamp:     now,
            }
        );
    }

    #[rstest]
    fn test_作成時の回付イベント(now: DateTime<Utc>) {
        let wf = WorkflowId::new();
        let recipients = [ActorId::new(), ActorId::new()];
        let steps = initial(RoutingStrategy::Sequential, &recipients, now);

        let events = activation_events(&wf, &steps, now);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].step_assignee(), Some(&recipients[0]));
    }

    #[test]
    fn test_イベントはtypeタグ付きでシリアライズされる() {
        let event = WorkflowEvent::WorkflowCompleted {
            workflow_id:  WorkflowId::new(),
            final_status: WorkflowStatus::PartiallyApproved,
            timestamp:    DateTime::from_timestamp(0, 0).unwrap(),
        };

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "workflow_completed");
        assert_eq!(json["final_status"], "partially_approved");
    }
}
