//! # 進捗計算
//!
//! ステップ列から進捗率と現在のステージを導出する。
//!
//! どちらも保存せず、読み出しのたびにステップから再計算する。ステップと独立に
//! 更新される値を持たないので、ステップの状態とずれることがない。

use serde::Serialize;

use super::{RoutingStrategy, Step, StepStatus, WorkflowStatus};

/// 現在のステージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurrentStage {
    /// 順次回付で判断待ちのステップ
    Step { name: String },
    /// 並列・双方向回付で全承認者の判断待ち
    AllRecipientsReview { remaining: usize, total: usize },
    Complete,
    Rejected,
    PartiallyApproved,
}

impl std::fmt::Display for CurrentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step { name } => write!(f, "{}", name),
            Self::AllRecipientsReview { remaining, total } => {
                write!(f, "All Recipients Review ({}/{} remaining)", remaining, total)
            }
            Self::Complete => write!(f, "Complete"),
            Self::Rejected => write!(f, "Rejected"),
            Self::PartiallyApproved => write!(f, "Partially Approved"),
        }
    }
}

/// 進捗率と現在のステージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// 0〜100 の整数
    pub percent: u8,
    pub stage:   CurrentStage,
}

/// 進捗計算
///
/// 状態を持たない純粋関数の集まり。
pub struct ProgressCalculator;

impl ProgressCalculator {
    pub fn calculate(
        strategy: &RoutingStrategy,
        steps: &[Step],
        status: WorkflowStatus,
    ) -> Progress {
        Progress {
            percent: Self::percent(steps),
            stage:   Self::current_stage(strategy, steps, status),
        }
    }

    /// 完了（承認・バイパス）したレビューステップの割合を四捨五入した百分率
    ///
    /// 申請ステップは分母にも分子にも含めない。
    ///
    /// ```rust
    /// use docflow_domain::workflow::ProgressCalculator;
    ///
    /// assert_eq!(ProgressCalculator::percent(&[]), 0);
    /// ```
    pub fn percent(steps: &[Step]) -> u8 {
        let (done, total) = steps
            .iter()
            .filter(|s| s.is_review())
            .fold((0u64, 0u64), |(done, total), s| {
                let counted = matches!(s.status(), StepStatus::Completed | StepStatus::Bypassed);
                (done + u64::from(counted), total + 1)
            });

        if total == 0 {
            return 0;
        }

        // 100 * done / total を整数演算で四捨五入する
        let rounded = (200 * done + total) / (2 * total);
        u8::try_from(rounded).unwrap_or(100)
    }

    pub fn current_stage(
        strategy: &RoutingStrategy,
        steps: &[Step],
        status: WorkflowStatus,
    ) -> CurrentStage {
        match status {
            WorkflowStatus::Approved => return CurrentStage::Complete,
            WorkflowStatus::Rejected => return CurrentStage::Rejected,
            WorkflowStatus::PartiallyApproved => return CurrentStage::PartiallyApproved,
            WorkflowStatus::Pending => {}
        }

        let mut reviews = steps.iter().filter(|s| s.is_review());

        if strategy.is_sequential() {
            return match reviews.find(|s| s.status() == StepStatus::Current) {
                Some(step) => CurrentStage::Step {
                    name: step.name().to_string(),
                },
                None => CurrentStage::Complete,
            };
        }

        let (remaining, total) = reviews.fold((0, 0), |(remaining, total), s| {
            (
                remaining + usize::from(s.status() == StepStatus::Current),
                total + 1,
            )
        });
        CurrentStage::AllRecipientsReview { remaining, total }
    }
}
