//! # 回付戦略
//!
//! 回付方式ごとの判定ロジック。現在のステップ列と操作から、新しいステップ列と
//! ワークフローステータスを計算する純粋関数として実装する。
//!
//! ## 回付方式と戦略の対応
//!
//! | 回付方式 | 戦略 | 備考 |
//! |---------|------|------|
//! | `Sequential` | [`RoutingStrategy::Sequential`] | 指定順に 1 人ずつ |
//! | `Reverse` | [`RoutingStrategy::Sequential`] | 作成時に承認者の並びを反転するだけ |
//! | `Parallel` | [`RoutingStrategy::Parallel`] | 全員同時。バイパス有無を保持 |
//! | `Bidirectional` | [`RoutingStrategy::Bidirectional`] | 全員同時 + 常にバイパス + 再送 |
//!
//! 戦略はワークフロー作成時に一度だけ選択し、以後は切り替えない。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::{Action, ActionKind, Step, StepStatus, WorkflowStatus};
use crate::{DomainError, actor::ActorId};

/// 回付方式（申請者が選択するもの）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RoutingType {
    /// 指定順に回付
    Sequential,
    /// 指定順の逆（最後の承認者から）に回付
    Reverse,
    /// 全員に同時に回付
    Parallel,
    /// 全員に同時に回付し、バイパスされた承認者へ再送できる
    Bidirectional,
}

impl RoutingType {
    /// 承認者の並びを回付順に並べ替える
    ///
    /// 逆順回付のみ反転する。申請ステップは並べ替えの対象外。
    pub fn arrange<T>(&self, mut recipients: Vec<T>) -> Vec<T> {
        if *self == Self::Reverse {
            recipients.reverse();
        }
        recipients
    }
}

impl std::str::FromStr for RoutingType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(Self::Sequential),
            "reverse" => Ok(Self::Reverse),
            "parallel" => Ok(Self::Parallel),
            "bidirectional" => Ok(Self::Bidirectional),
            _ => Err(DomainError::Validation(format!("不正な回付方式: {}", s))),
        }
    }
}

/// 回付戦略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingStrategy {
    /// 順次回付（逆順回付を含む）。Current は常に高々 1 つ
    Sequential,
    /// 並列回付
    Parallel {
        /// 却下をバイパスとして扱い、他の承認者を止めない
        bypass: bool,
    },
    /// 双方向回付。常にバイパス扱いで、再送をサポートする
    Bidirectional,
}

/// 戦略による判定結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub steps:  Vec<Step>,
    pub status: WorkflowStatus,
}

impl RoutingStrategy {
    /// 回付方式とバイパス指定から戦略を選択する
    ///
    /// 双方向回付は指定にかかわらずバイパス有効として扱う。
    ///
    /// # Errors
    ///
    /// - `DomainError::UnsupportedOperation`: 順次・逆順回付でバイパスを指定した場合
    pub fn select(routing_type: RoutingType, has_bypass: bool) -> Result<Self, DomainError> {
        match routing_type {
            RoutingType::Sequential | RoutingType::Reverse if has_bypass => {
                Err(DomainError::UnsupportedOperation(format!(
                    "{} 回付ではバイパスを指定できません",
                    routing_type
                )))
            }
            RoutingType::Sequential | RoutingType::Reverse => Ok(Self::Sequential),
            RoutingType::Parallel => Ok(Self::Parallel { bypass: has_bypass }),
            RoutingType::Bidirectional => Ok(Self::Bidirectional),
        }
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self, Self::Sequential)
    }

    pub fn allows_bypass(&self) -> bool {
        matches!(self, Self::Parallel { bypass: true } | Self::Bidirectional)
    }

    pub fn supports_resend(&self) -> bool {
        matches!(self, Self::Bidirectional)
    }

    /// 作成直後のステップ列に対して最初の回付を行う
    ///
    /// 順次回付は先頭の承認者だけ、それ以外は全承認者を Current にする。
    pub fn initial_steps(&self, steps: Vec<Step>) -> Result<Vec<Step>, DomainError> {
        let mut activated_any = false;
        steps
            .into_iter()
            .map(|step| {
                if !step.is_review() || (self.is_sequential() && activated_any) {
                    return Ok(step);
                }
                activated_any = true;
                step.activated()
            })
            .collect()
    }

    /// 承認・却下を適用した結果を計算する
    ///
    /// # Errors
    ///
    /// - `DomainError::UnknownActor`: 操作者がどの承認者とも一致しない場合
    /// - `DomainError::StepAlreadyResolved`: 担当ステップが既に終端状態の場合
    /// - `DomainError::StepNotCurrent`: 順次回付でまだ順番が来ていない場合
    pub fn decide(
        &self,
        steps: &[Step],
        action: &Action,
        now: DateTime<Utc>,
    ) -> Result<RoutingDecision, DomainError> {
        let index = find_review_step(steps, &action.actor_id)?;
        let actor = action.actor_id.clone();
        let comment = action.comment.clone();

        let steps = replace_at(steps, index, |step| match action.kind {
            ActionKind::Approve => step.completed(actor, comment, now),
            ActionKind::Reject if self.allows_bypass() => step.bypassed(actor, comment, now),
            ActionKind::Reject => step.rejected(actor, comment, now),
        })?;

        let steps = match steps[index].status() {
            StepStatus::Rejected => cancel_remaining(steps),
            StepStatus::Completed if self.is_sequential() => promote_next(steps)?,
            _ => steps,
        };

        Ok(self.decision(steps))
    }

    /// バイパスされた 1 人の承認者へ再送する
    ///
    /// # Errors
    ///
    /// - `DomainError::UnsupportedOperation`: 双方向回付以外の場合
    /// - `DomainError::UnknownActor`: 再送先がどの承認者とも一致しない場合
    /// - `DomainError::InvalidResendTarget`: 再送先がバイパスされていない場合
    pub fn resend(&self, steps: &[Step], target: &ActorId) -> Result<RoutingDecision, DomainError> {
        self.ensure_resend_supported()?;

        let index = find_review_step(steps, target)?;
        let steps = replace_at(steps, index, Step::reopened)?;

        Ok(self.decision(steps))
    }

    /// バイパスされた全承認者へ再送する
    ///
    /// # Errors
    ///
    /// - `DomainError::UnsupportedOperation`: 双方向回付以外の場合
    /// - `DomainError::NoBypassedRecipients`: バイパスされた承認者がいない場合
    pub fn resend_all(&self, steps: &[Step]) -> Result<RoutingDecision, DomainError> {
        self.ensure_resend_supported()?;

        if !steps.iter().any(|s| s.status() == StepStatus::Bypassed) {
            return Err(DomainError::NoBypassedRecipients);
        }

        let steps = steps
            .iter()
            .cloned()
            .map(|step| {
                if step.status() == StepStatus::Bypassed {
                    step.reopened()
                } else {
                    Ok(step)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.decision(steps))
    }

    /// ステップ列からワークフローステータスを導出する
    pub fn derive_status(&self, steps: &[Step]) -> WorkflowStatus {
        let reviews: Vec<&Step> = steps.iter().filter(|s| s.is_review()).collect();
        if reviews.is_empty() {
            return WorkflowStatus::Pending;
        }

        if reviews.iter().any(|s| s.status() == StepStatus::Rejected) {
            return WorkflowStatus::Rejected;
        }
        if reviews.iter().all(|s| s.status() == StepStatus::Completed) {
            return WorkflowStatus::Approved;
        }
        if self.allows_bypass()
            && reviews.iter().all(|s| s.is_terminal())
            && reviews.iter().any(|s| s.status() == StepStatus::Bypassed)
        {
            return WorkflowStatus::PartiallyApproved;
        }
        WorkflowStatus::Pending
    }

    fn decision(&self, steps: Vec<Step>) -> RoutingDecision {
        let status = self.derive_status(&steps);
        RoutingDecision { steps, status }
    }

    fn ensure_resend_supported(&self) -> Result<(), DomainError> {
        if self.supports_resend() {
            return Ok(());
        }
        Err(DomainError::UnsupportedOperation(
            "再送は双方向回付でのみ実行できます".to_string(),
        ))
    }
}

/// 担当者が一致するレビューステップの位置を探す
fn find_review_step(steps: &[Step], actor_id: &ActorId) -> Result<usize, DomainError> {
    steps
        .iter()
        .position(|s| s.is_review() && s.assignee() == actor_id)
        .ok_or_else(|| DomainError::UnknownActor {
            actor_id: actor_id.clone(),
        })
}

fn replace_at(
    steps: &[Step],
    index: usize,
    f: impl FnOnce(Step) -> Result<Step, DomainError>,
) -> Result<Vec<Step>, DomainError> {
    let mut f = Some(f);
    steps
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, step)| match f.take_if(|_| i == index) {
            Some(f) => f(step),
            None => Ok(step),
        })
        .collect()
}

fn cancel_remaining(steps: Vec<Step>) -> Vec<Step> {
    steps.into_iter().map(Step::cancelled).collect()
}

/// 順次回付で次の待機中ステップを Current にする
fn promote_next(steps: Vec<Step>) -> Result<Vec<Step>, DomainError> {
    match steps
        .iter()
        .position(|s| s.is_review() && s.status() == StepStatus::Pending)
    {
        Some(next) => replace_at(&steps, next, Step::activated),
        None => Ok(steps),
    }
}
