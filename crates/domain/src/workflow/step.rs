//! # ステップ
//!
//! 1 つのワークフロー内で 1 人の担当者に割り当てられた作業単位。
//!
//! ## 状態遷移
//!
//! ```text
//! Pending ──activated──→ Current ──completed──→ Completed
//!    │                      ├──rejected───→ Rejected
//!    │                      ├──bypassed───→ Bypassed ──reopened──→ Current
//!    └──cancelled──→ Cancelled ←─cancelled─┘
//! ```
//!
//! Completed / Rejected / Bypassed / Cancelled は終端状態で、以後変更できない。
//! 唯一の例外は双方向回付の再送で、Bypassed を Current に戻す（[`Step::reopened`]）。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{DomainError, actor::ActorId, value_objects::StepName};

/// ステップの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepKind {
    /// 申請（擬似ステップ）。ワークフローに必ず 1 つだけ存在し、作成時点で完了している
    Submission,
    /// 承認者によるレビュー
    Review,
}

/// ステップステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepStatus {
    /// 待機中（順次回付でまだ順番が来ていない）
    Pending,
    /// 担当者の判断待ち
    Current,
    /// 承認済み
    Completed,
    /// 却下
    Rejected,
    /// バイパス（却下されたが他の承認者は続行）
    Bypassed,
    /// 取り消し（他の却下により打ち切られた）
    Cancelled,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Rejected | Self::Bypassed | Self::Cancelled
        )
    }
}

impl std::str::FromStr for StepStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "current" => Ok(Self::Current),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            "bypassed" => Ok(Self::Bypassed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(DomainError::Validation(format!(
                "不正なステップステータス: {}",
                s
            ))),
        }
    }
}

/// ステップエンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    kind: StepKind,
    name: StepName,
    assignee: ActorId,
    status: StepStatus,
    actioned_by: Option<ActorId>,
    actioned_at: Option<DateTime<Utc>>,
    comment: Option<String>,
    resend_count: u32,
}

/// ステップの復元パラメータ
pub struct StepRecord {
    pub kind: StepKind,
    pub name: StepName,
    pub assignee: ActorId,
    pub status: StepStatus,
    pub actioned_by: Option<ActorId>,
    pub actioned_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub resend_count: u32,
}

impl Step {
    /// 申請ステップを作成する
    ///
    /// 申請者自身が担当者で、作成時点で Completed になっている。
    pub fn submission(submitted_by: ActorId, now: DateTime<Utc>) -> Self {
        Self {
            kind: StepKind::Submission,
            name: StepName::submission(),
            assignee: submitted_by.clone(),
            status: StepStatus::Completed,
            actioned_by: Some(submitted_by),
            actioned_at: Some(now),
            comment: None,
            resend_count: 0,
        }
    }

    /// Pending のレビューステップを作成する
    pub fn review(name: StepName, assignee: ActorId) -> Self {
        Self {
            kind: StepKind::Review,
            name,
            assignee,
            status: StepStatus::Pending,
            actioned_by: None,
            actioned_at: None,
            comment: None,
            resend_count: 0,
        }
    }

    /// 既存のデータから復元する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 終端状態と `actioned_by` の整合が取れていない場合
    pub fn from_record(record: StepRecord) -> Result<Self, DomainError> {
        let needs_actor = matches!(
            record.status,
            StepStatus::Completed | StepStatus::Rejected | StepStatus::Bypassed
        );
        if needs_actor != record.actioned_by.is_some() {
            return Err(DomainError::Validation(format!(
                "ステップ {} の処理者がステータス {} と整合しません",
                record.assignee, record.status
            )));
        }

        Ok(Self {
            kind: record.kind,
            name: record.name,
            assignee: record.assignee,
            status: record.status,
            actioned_by: record.actioned_by,
            actioned_at: record.actioned_at,
            comment: record.comment,
            resend_count: record.resend_count,
        })
    }

    // Getter メソッド

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn name(&self) -> &StepName {
        &self.name
    }

    pub fn assignee(&self) -> &ActorId {
        &self.assignee
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn actioned_by(&self) -> Option<&ActorId> {
        self.actioned_by.as_ref()
    }

    pub fn actioned_at(&self) -> Option<DateTime<Utc>> {
        self.actioned_at
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn resend_count(&self) -> u32 {
        self.resend_count
    }

    pub fn is_review(&self) -> bool {
        self.kind == StepKind::Review
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    // ビジネスロジックメソッド

    /// Pending のステップを Current にする
    pub fn activated(self) -> Result<Self, DomainError> {
        if self.status != StepStatus::Pending {
            return Err(DomainError::InvariantViolation(format!(
                "ステップ {} は {} のため回付できません",
                self.assignee, self.status
            )));
        }

        Ok(Self {
            status: StepStatus::Current,
            ..self
        })
    }

    /// 承認する（Current → Completed）
    pub fn completed(
        self,
        actor: ActorId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        self.resolve(StepStatus::Completed, actor, comment, now)
    }

    /// 却下する（Current → Rejected）
    pub fn rejected(
        self,
        actor: ActorId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        self.resolve(StepStatus::Rejected, actor, comment, now)
    }

    /// 却下をバイパスとして記録する（Current → Bypassed）
    pub fn bypassed(
        self,
        actor: ActorId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        self.resolve(StepStatus::Bypassed, actor, comment, now)
    }

    fn resolve(
        self,
        to: StepStatus,
        actor: ActorId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        match self.status {
            StepStatus::Current => Ok(Self {
                status: to,
                actioned_by: Some(actor),
                actioned_at: Some(now),
                comment,
                ..self
            }),
            StepStatus::Pending => Err(DomainError::StepNotCurrent {
                assignee: self.assignee,
            }),
            status => Err(DomainError::StepAlreadyResolved {
                assignee: self.assignee,
                status,
            }),
        }
    }

    /// 打ち切る（Pending / Current → Cancelled）
    ///
    /// 終端状態のステップはそのまま返す。却下時に残りをまとめて打ち切るために使う。
    pub fn cancelled(self) -> Self {
        if self.is_terminal() {
            return self;
        }
        Self {
            status: StepStatus::Cancelled,
            ..self
        }
    }

    /// バイパスされたステップを再送して Current に戻す
    ///
    /// 前回の処理者・処理日時・コメントは消去し、再送回数だけ残す。
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidResendTarget`: Bypassed 以外のステップの場合
    pub fn reopened(self) -> Result<Self, DomainError> {
        if self.status != StepStatus::Bypassed {
            return Err(DomainError::InvalidResendTarget {
                assignee: self.assignee,
                status:   self.status,
            });
        }

        Ok(Self {
            status: StepStatus::Current,
            actioned_by: None,
            actioned_at: None,
            comment: None,
            resend_count: self.resend_count + 1,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[fixture]
    fn current_step() -> Step {
        Step::review(StepName::new("HOD Review").unwrap(), ActorId::new())
            .activated()
            .unwrap()
    }

    mod step {
        use pretty_assertions::assert_eq;

        use super::*;

        #[rstest]
        fn test_申請ステップは作成時点で完了している(now: DateTime<Utc>) {
            let submitter = ActorId::new();

            let sut = Step::submission(submitter.clone(), now);

            let expected = Step::from_record(StepRecord {
                kind: StepKind::Submission,
                name: StepName::submission(),
                assignee: submitter.clone(),
                status: StepStatus::Completed,
                actioned_by: Some(submitter),
                actioned_at: Some(now),
                comment: None,
                resend_count: 0,
            })
            .unwrap();
            assert_eq!(sut, expected);
        }

        #[rstest]
        fn test_承認後の状態(current_step: Step, now: DateTime<Utc>) {
            let actor = current_step.assignee().clone();
            let before = current_step.clone();

            let sut = current_step
                .completed(actor.clone(), Some("LGTM".to_string()), now)
                .unwrap();

            let expected = Step::from_record(StepRecord {
                kind: StepKind::Review,
                name: before.name().clone(),
                assignee: before.assignee().clone(),
                status: StepStatus::Completed,
                actioned_by: Some(actor),
                actioned_at: Some(now),
                comment: Some("LGTM".to_string()),
                resend_count: 0,
            })
            .unwrap();
            assert_eq!(sut, expected);
        }

        #[rstest]
        fn test_完了済みステップへの再操作はエラー(current_step: Step, now: DateTime<Utc>) {
            let actor = current_step.assignee().clone();
            let completed = current_step.completed(actor.clone(), None, now).unwrap();

            let result = completed.rejected(actor.clone(), None, now);

            assert_eq!(
                result,
                Err(DomainError::StepAlreadyResolved {
                    assignee: actor,
                    status:   StepStatus::Completed,
                })
            );
        }

        #[rstest]
        fn test_待機中ステップの承認はエラー(now: DateTime<Utc>) {
            let actor = ActorId::new();
            let step = Step::review(StepName::new("Principal").unwrap(), actor.clone());

            let result = step.completed(actor.clone(), None, now);

            assert_eq!(result, Err(DomainError::StepNotCurrent { assignee: actor }));
        }

        #[rstest]
        fn test_終端状態のステップは打ち切っても変わらない(current_step: Step, now: DateTime<Utc>) {
            let actor = current_step.assignee().clone();
            let rejected = current_step.rejected(actor, None, now).unwrap();

            let sut = rejected.clone().cancelled();

            assert_eq!(sut, rejected);
        }

        #[rstest]
        fn test_再送で処理内容が消去され再送回数が増える(current_step: Step, now: DateTime<Utc>) {
            let actor = current_step.assignee().clone();
            let bypassed = current_step
                .bypassed(actor, Some("要修正".to_string()), now)
                .unwrap();

            let sut = bypassed.reopened().unwrap();

            assert_eq!(sut.status(), StepStatus::Current);
            assert_eq!(sut.actioned_by(), None);
            assert_eq!(sut.actioned_at(), None);
            assert_eq!(sut.comment(), None);
            assert_eq!(sut.resend_count(), 1);
        }

        #[rstest]
        fn test_バイパス以外の再送はエラー(current_step: Step) {
            let assignee = current_step.assignee().clone();

            let result = current_step.reopened();

            assert_eq!(
                result,
                Err(DomainError::InvalidResendTarget {
                    assignee,
                    status: StepStatus::Current,
                })
            );
        }

        #[rstest]
        fn test_処理者のない完了ステップは復元できない() {
            let result = Step::from_record(StepRecord {
                kind: StepKind::Review,
                name: StepName::new("HOD Review").unwrap(),
                assignee: ActorId::new(),
                status: StepStatus::Completed,
                actioned_by: None,
                actioned_at: None,
                comment: None,
                resend_count: 0,
            });

            assert!(matches!(result, Err(DomainError::Validation(_))));
        }
    }

    mod step_status {
        use pretty_assertions::assert_eq;

        use super::*;

        #[rstest]
        #[case(StepStatus::Pending, false)]
        #[case(StepStatus::Current, false)]
        #[case(StepStatus::Completed, true)]
        #[case(StepStatus::Rejected, true)]
        #[case(StepStatus::Bypassed, true)]
        #[case(StepStatus::Cancelled, true)]
        fn test_終端判定(#[case] status: StepStatus, #[case] expected: bool) {
            assert_eq!(status.is_terminal(), expected);
        }

        #[rstest]
        #[case(StepStatus::Bypassed, "bypassed")]
        #[case(StepStatus::Cancelled, "cancelled")]
        fn test_文字列との相互変換(#[case] status: StepStatus, #[case] s: &str) {
            assert_eq!(status.to_string(), s);
            assert_eq!(s.parse::<StepStatus>().unwrap(), status);
        }
    }
}
