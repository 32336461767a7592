//! # 不変条件
//!
//! すべての遷移の後に検証する条件。違反は実装バグなので
//! `DomainError::InvariantViolation` として返し、遷移結果は採用しない。
//!
//! | 条件 | 対象 |
//! |------|------|
//! | 申請ステップがちょうど 1 つ、先頭にあり、完了している | 全方式 |
//! | 承認者が 1 人以上いる | 全方式 |
//! | Current は高々 1 つで、未解決ステップの先頭にある | 順次・逆順 |
//! | Pending のステップが存在しない | 並列・双方向 |
//! | 保持しているステータスがステップから導出したものと一致する | 全方式 |
//! | 終端ステップは変化しない（再送による Bypassed → Current のみ例外） | 遷移前後 |

use super::{RoutingStrategy, Step, StepKind, StepStatus, WorkflowStatus};
use crate::DomainError;

/// ワークフローの状態が不変条件を満たすか検証する
pub fn check(
    strategy: &RoutingStrategy,
    steps: &[Step],
    status: WorkflowStatus,
) -> Result<(), DomainError> {
    check_submission(steps)?;

    let reviews: Vec<&Step> = steps.iter().filter(|s| s.is_review()).collect();
    if reviews.is_empty() {
        return Err(violation("承認者ステップが存在しません"));
    }

    if strategy.is_sequential() {
        check_sequential_order(&reviews)?;
    } else if reviews.iter().any(|s| s.status() == StepStatus::Pending) {
        return Err(violation("並列回付に待機中のステップがあります"));
    }

    let derived = strategy.derive_status(steps);
    if derived != status {
        return Err(violation(&format!(
            "ステータス {} がステップから導出した {} と一致しません",
            status, derived
        )));
    }

    Ok(())
}

/// 遷移前後で終端ステップが変化していないか検証する
pub fn check_transition(before: &[Step], after: &[Step]) -> Result<(), DomainError> {
    if before.len() != after.len() {
        return Err(violation("遷移でステップ数が変化しました"));
    }

    for (prev, next) in before.iter().zip(after) {
        if prev.assignee() != next.assignee() || prev.kind() != next.kind() {
            return Err(violation("遷移でステップの並びが変化しました"));
        }
        if !prev.is_terminal() || prev == next {
            continue;
        }
        let reopened = prev.status() == StepStatus::Bypassed && next.status() == StepStatus::Current;
        if !reopened {
            return Err(violation(&format!(
                "終端ステップ {} が {} から {} に変化しました",
                prev.assignee(),
                prev.status(),
                next.status()
            )));
        }
    }

    Ok(())
}

fn check_submission(steps: &[Step]) -> Result<(), DomainError> {
    let submissions = steps
        .iter()
        .filter(|s| s.kind() == StepKind::Submission)
        .count();
    if submissions != 1 {
        return Err(violation(&format!(
            "申請ステップが {} 個あります",
            submissions
        )));
    }

    match steps.first() {
        Some(first)
            if first.kind() == StepKind::Submission && first.status() == StepStatus::Completed =>
        {
            Ok(())
        }
        _ => Err(violation("申請ステップが先頭で完了していません")),
    }
}

/// 順次回付: 解決済み → Current（高々 1 つ）→ 待機中 の並びになっていること
///
/// 却下後は残りが Cancelled になるため、Current も Pending も存在しない。
fn check_sequential_order(reviews: &[&Step]) -> Result<(), DomainError> {
    let current = reviews
        .iter()
        .filter(|s| s.status() == StepStatus::Current)
        .count();
    if current > 1 {
        return Err(violation(&format!(
            "順次回付で Current のステップが {} 個あります",
            current
        )));
    }

    let first_open = reviews.iter().position(|s| !s.is_terminal());
    if let Some(index) = first_open {
        if reviews[index].status() != StepStatus::Current {
            return Err(violation("順次回付で未解決の先頭ステップが Current ではありません"));
        }
        if reviews[index + 1..]
            .iter()
            .any(|s| s.status() != StepStatus::Pending)
        {
            return Err(violation("順次回付で Current の後ろに待機中以外のステップがあります"));
        }
    }

    Ok(())
}

fn violation(message: &str) -> DomainError {
    DomainError::InvariantViolation(message.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::{actor::ActorId, value_objects::StepName, workflow::StepRecord};

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn review(status: StepStatus, now: DateTime<Utc>) -> Step {
        let assignee = ActorId::new();
        let actioned = matches!(
            status,
            StepStatus::Completed | StepStatus::Rejected | StepStatus::Bypassed
        );
        Step::from_record(StepRecord {
            kind: StepKind::Review,
            name: StepName::new("Review").unwrap(),
            assignee: assignee.clone(),
            status,
            actioned_by: actioned.then_some(assignee),
            actioned_at: actioned.then_some(now),
            comment: None,
            resend_count: 0,
        })
        .unwrap()
    }

    fn with_submission(reviews: Vec<Step>, now: DateTime<Utc>) -> Vec<Step> {
        let mut steps = vec![Step::submission(ActorId::new(), now)];
        steps.extend(reviews);
        steps
    }

    #[rstest]
    fn test_正常な順次回付は検証を通る(now: DateTime<Utc>) {
        let steps = with_submission(
            vec![
                review(StepStatus::Completed, now),
                review(StepStatus::Current, now),
                review(StepStatus::Pending, now),
            ],
            now,
        );

        assert_eq!(
            check(&RoutingStrategy::Sequential, &steps, WorkflowStatus::Pending),
            Ok(())
        );
    }

    #[rstest]
    fn test_順次回付でcurrentが2つあると違反(now: DateTime<Utc>) {
        let steps = with_submission(
            vec![review(StepStatus::Current, now), review(StepStatus::Current, now)],
            now,
        );

        let result = check(&RoutingStrategy::Sequential, &steps, WorkflowStatus::Pending);

        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }

    #[rstest]
    fn test_順次回付で先頭を飛ばしてcurrentがあると違反(now: DateTime<Utc>) {
        let steps = with_submission(
            vec![review(StepStatus::Pending, now), review(StepStatus::Current, now)],
            now,
        );

        let result = check(&RoutingStrategy::Sequential, &steps, WorkflowStatus::Pending);

        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }

    #[rstest]
    fn test_並列回付に待機中があると違反(now: DateTime<Utc>) {
        let steps = with_submission(
            vec![review(StepStatus::Current, now), review(StepStatus::Pending, now)],
            now,
        );

        let result = check(
            &RoutingStrategy::Parallel { bypass: false },
            &steps,
            WorkflowStatus::Pending,
        );

        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }

    #[rstest]
    fn test_ステータスの不一致は違反(now: DateTime<Utc>) {
        let steps = with_submission(vec![review(StepStatus::Completed, now)], now);

        let result = check(
            &RoutingStrategy::Parallel { bypass: false },
            &steps,
            WorkflowStatus::Pending,
        );

        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }

    #[rstest]
    fn test_申請ステップがないと違反(now: DateTime<Utc>) {
        let steps = vec![review(StepStatus::Current, now)];

        let result = check(
            &RoutingStrategy::Parallel { bypass: false },
            &steps,
            WorkflowStatus::Pending,
        );

        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }

    #[rstest]
    fn test_承認者がいないと違反(now: DateTime<Utc>) {
        let steps = with_submission(Vec::new(), now);

        let result = check(&RoutingStrategy::Sequential, &steps, WorkflowStatus::Pending);

        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }

    #[rstest]
    fn test_終端ステップの変化は違反(now: DateTime<Utc>) {
        let before = with_submission(vec![review(StepStatus::Rejected, now)], now);
        let mut after = before.clone();
        after[1] = Step::from_record(StepRecord {
            kind: StepKind::Review,
            name: before[1].name().clone(),
            assignee: before[1].assignee().clone(),
            status: StepStatus::Current,
            actioned_by: None,
            actioned_at: None,
            comment: None,
            resend_count: 0,
        })
        .unwrap();

        let result = check_transition(&before, &after);

        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }

    #[rstest]
    fn test_再送によるバイパスからの復帰は許容される(now: DateTime<Utc>) {
        let before = with_submission(vec![review(StepStatus::Bypassed, now)], now);
        let mut after = before.clone();
        after[1] = before[1].clone().reopened().unwrap();

        assert_eq!(check_transition(&before, &after), Ok(()));
    }
}
