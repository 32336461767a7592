//! イベント配信の統合テスト
//!
//! 配信先の障害が状態遷移の成否に影響せず、溜まったイベントが後から順に届くことを検証する。
//!
//! ## テストケース
//!
//! - 配信失敗でも操作は成功し、イベントはアウトボックスに残る
//! - flush で残ったイベントが元の順序で届く
//! - 後続の操作はアウトボックスの先頭から配信する（追い越さない）
//! - 冪等キーは遷移ごとに異なる
//! - 保存後の配信中にキャンセルされてもイベントは失われない
//! - 遅い配信先は別のワークフローの操作を待たせない

use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use docflow_domain::workflow::{Action, EventKind, RoutingType, WorkflowEvent, WorkflowStatus};
use docflow_infra::{
    DocumentStore,
    mock::{DelayedEventSink, FailingEventSink},
};
use docflow_routing_service::{test_utils::WorkflowTestBuilder, usecase::FlushReport};
use pretty_assertions::assert_eq;
use tokio_test::assert_ok;

// --- テストヘルパー ---

fn kinds(sink: &FailingEventSink) -> Vec<EventKind> {
    sink.delivered().iter().map(|e| e.event.kind()).collect()
}

fn completed_workflows(events: &[WorkflowEvent]) -> usize {
    events
        .iter()
        .filter(|e| e.kind() == EventKind::WorkflowCompleted)
        .count()
}

// --- テストケース ---

#[tokio::test]
async fn test_配信に失敗しても操作は成功しイベントは残る() {
    // Given
    let builder = WorkflowTestBuilder::new();
    let sink = FailingEventSink::new(1);
    let sut = builder.build_engine_with_sink(Arc::new(sink.clone()));
    let recipients = builder.actors(2);

    // When
    let result = sut
        .submit(builder.submit_input(&recipients, RoutingType::Parallel, false))
        .await;

    // Then
    let workflow = assert_ok!(result);
    assert_eq!(workflow.status(), WorkflowStatus::Pending);
    assert_eq!(sut.pending_events(), 2);
    assert!(sink.delivered().is_empty());

    // When: 配信先の復旧後に flush
    let report = sut.flush_outbox().await;

    // Then
    assert_eq!(
        report,
        FlushReport {
            delivered:     2,
            dead_lettered: 0,
            pending:       0,
        }
    );
    assert_eq!(
        kinds(&sink),
        vec![EventKind::StepActivated, EventKind::StepActivated]
    );
    let assignees: Vec<_> = sink
        .delivered()
        .iter()
        .filter_map(|e| e.event.step_assignee().cloned())
        .collect();
    assert_eq!(assignees, recipients);
}

#[tokio::test]
async fn test_後続の操作は溜まったイベントを先に配信する() {
    // Given
    let builder = WorkflowTestBuilder::new();
    let sink = FailingEventSink::new(0);
    let sut = builder.build_engine_with_sink(Arc::new(sink.clone()));
    let recipients = builder.actors(1);
    let workflow = sut
        .submit(builder.submit_input(&recipients, RoutingType::Sequential, false))
        .await
        .unwrap();
    sink.fail_next(1);
    sut.apply(
        workflow.id(),
        &Action::reject(workflow.id().clone(), recipients[0].clone()),
    )
    .await
    .unwrap();
    assert_eq!(sut.pending_events(), 2);

    // When: 別のワークフローの申請で flush が走る
    sut.submit(builder.submit_input(&recipients, RoutingType::Sequential, false))
        .await
        .unwrap();

    // Then
    assert_eq!(sut.pending_events(), 0);
    assert_eq!(
        kinds(&sink),
        vec![
            EventKind::StepActivated,
            EventKind::StepResolved,
            EventKind::WorkflowCompleted,
            EventKind::StepActivated,
        ]
    );
    // 1 回失敗した分だけ試行が多い
    assert_eq!(sink.attempts(), 5);
}

#[tokio::test]
async fn test_冪等キーは遷移ごとに異なる() {
    // Given
    let builder = WorkflowTestBuilder::new();
    let sink = FailingEventSink::new(0);
    let sut = builder.build_engine_with_sink(Arc::new(sink.clone()));
    let recipients = builder.actors(1);

    // When: 再送で同じ承認者の StepActivated が 2 回出る
    let workflow = sut
        .submit(builder.submit_input(&recipients, RoutingType::Bidirectional, false))
        .await
        .unwrap();
    sut.apply(
        workflow.id(),
        &Action::reject(workflow.id().clone(), recipients[0].clone()),
    )
    .await
    .unwrap();
    sut.resend(workflow.id(), builder.submitter(), &recipients[0])
        .await
        .unwrap();

    // Then
    let delivered = sink.delivered();
    let activations = delivered
        .iter()
        .filter(|e| e.event.kind() == EventKind::StepActivated)
        .count();
    assert_eq!(activations, 2);
    let keys: HashSet<_> = delivered.iter().map(|e| e.idempotency_key()).collect();
    assert_eq!(keys.len(), delivered.len());
}

#[tokio::test]
async fn test_配信中にキャンセルされても保存済みの遷移のイベントは残る() {
    // Given
    let builder = WorkflowTestBuilder::new();
    let sut = builder.build_engine_with_sink(Arc::new(DelayedEventSink::new(
        Duration::from_millis(200),
        builder.sink().clone(),
    )));
    let recipients = builder.actors(1);
    let workflow = sut
        .submit(builder.submit_input(&recipients, RoutingType::Sequential, false))
        .await
        .unwrap();
    let approve = Action::approve(workflow.id().clone(), recipients[0].clone());

    // When: 配信先への publish を待っている間に呼び出し元が諦める
    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), sut.apply(workflow.id(), &approve)).await;

    // Then: 遷移は保存済みで、イベントはアウトボックスに残っている
    assert!(cancelled.is_err());
    let stored = builder.store().find_by_id(workflow.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), WorkflowStatus::Approved);
    assert_eq!(sut.pending_events(), 2);

    let report = sut.flush_outbox().await;
    assert_eq!(report.delivered, 2);
    let kinds: Vec<EventKind> = builder.sink().events().iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::StepActivated,
            EventKind::StepResolved,
            EventKind::WorkflowCompleted,
        ]
    );
}

#[tokio::test]
async fn test_遅い配信先は別のワークフローの操作を待たせない() {
    // Given: 2 つのワークフローを申請済み
    let builder = WorkflowTestBuilder::new();
    let setup = builder.build_engine();
    let (first_recipients, second_recipients) = (builder.actors(1), builder.actors(1));
    let first = setup
        .submit(builder.submit_input(&first_recipients, RoutingType::Sequential, false))
        .await
        .unwrap();
    let second = setup
        .submit(builder.submit_input(&second_recipients, RoutingType::Sequential, false))
        .await
        .unwrap();

    let sut = Arc::new(builder.build_engine_with_sink(Arc::new(DelayedEventSink::new(
        Duration::from_millis(300),
        builder.sink().clone(),
    ))));
    let in_flight = {
        let sut = sut.clone();
        let workflow_id = first.id().clone();
        let approve = Action::approve(workflow_id.clone(), first_recipients[0].clone());
        tokio::spawn(async move { sut.apply(&workflow_id, &approve).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // When: 1 つ目の配信中に 2 つ目のワークフローを承認
    let approve = Action::approve(second.id().clone(), second_recipients[0].clone());
    let started = Instant::now();
    let result = sut.apply(second.id(), &approve).await;
    let elapsed = started.elapsed();

    // Then
    assert_ok!(result);
    assert!(elapsed < Duration::from_millis(200), "elapsed: {elapsed:?}");

    // 配信中の操作が 2 つ目のイベントも届ける
    assert_ok!(in_flight.await.unwrap());
    assert_eq!(sut.pending_events(), 0);
    assert_eq!(completed_workflows(&builder.sink().events()), 2);
}
