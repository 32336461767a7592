//! ワークフローテストビルダー
//!
//! テストコードの重複を削減するためのビルダーパターン実装。
//! 標準的なテストデータと失敗注入できるモックのセットアップを提供する。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use docflow_domain::{
    actor::{ActorId, ActorProfile},
    clock::SteppingClock,
    value_objects::{DocumentTitle, StepName},
    workflow::{Recipient, RoutingType},
};
use docflow_infra::{
    EventSink,
    InMemoryActorDirectory,
    event_sink::RecordingEventSink,
    mock::MockDocumentStore,
};

use crate::usecase::{SubmitWorkflowInput, WorkflowEngine};

/// ワークフローテストビルダー
///
/// ストアと記録用の配信先はビルダーが保持し、`build_engine` で作るエンジン間で共有する。
/// 時刻は操作ごとに 1 秒進むので、イベントの冪等キーが操作ごとに異なる。
///
/// # 使用例
///
/// ```ignore
/// use docflow_routing_service::test_utils::WorkflowTestBuilder;
///
/// #[tokio::test]
/// async fn test_example() {
///     let builder = WorkflowTestBuilder::new();
///     let sut = builder.build_engine();
///     let recipients = builder.actors(3);
///
///     let workflow = sut
///         .submit(builder.submit_input(&recipients, RoutingType::Sequential, false))
///         .await
///         .unwrap();
///
///     assert_eq!(builder.sink().events().len(), 1);
/// }
/// ```
pub struct WorkflowTestBuilder {
    submitter: ActorId,
    now:       DateTime<Utc>,
    store:     MockDocumentStore,
    sink:      RecordingEventSink,
    directory: InMemoryActorDirectory,
}

impl WorkflowTestBuilder {
    /// デフォルト値で新しいビルダーを作成
    pub fn new() -> Self {
        Self {
            submitter: ActorId::new(),
            now:       DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
            store:     MockDocumentStore::new(),
            sink:      RecordingEventSink::new(),
            directory: InMemoryActorDirectory::default(),
        }
    }

    /// アクターディレクトリの内容を指定
    pub fn with_profiles(mut self, profiles: impl IntoIterator<Item = ActorProfile>) -> Self {
        self.directory = InMemoryActorDirectory::new(profiles);
        self
    }

    /// 開始時刻を指定
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// 申請者
    pub fn submitter(&self) -> &ActorId {
        &self.submitter
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn store(&self) -> &MockDocumentStore {
        &self.store
    }

    pub fn sink(&self) -> &RecordingEventSink {
        &self.sink
    }

    /// 承認者用のアクター ID を `count` 人分生成する
    pub fn actors(&self, count: usize) -> Vec<ActorId> {
        (0..count).map(|_| ActorId::new()).collect()
    }

    /// 申請入力を作成する
    ///
    /// ステップ名は指定順に `"Review 1"`, `"Review 2"`, ... になる。
    pub fn submit_input(
        &self,
        recipients: &[ActorId],
        routing_type: RoutingType,
        has_bypass: bool,
    ) -> SubmitWorkflowInput {
        SubmitWorkflowInput {
            title: DocumentTitle::new("備品購入申請").unwrap(),
            submitted_by: self.submitter.clone(),
            recipients: recipients
                .iter()
                .enumerate()
                .map(|(i, actor_id)| Recipient {
                    actor_id:  actor_id.clone(),
                    step_name: StepName::new(format!("Review {}", i + 1)).unwrap(),
                })
                .collect(),
            routing_type,
            has_bypass,
        }
    }

    /// 記録用の配信先を使うエンジンを構築
    pub fn build_engine(&self) -> WorkflowEngine {
        self.build_engine_with_sink(Arc::new(self.sink.clone()))
    }

    /// 任意の配信先を使うエンジンを構築
    pub fn build_engine_with_sink(&self, sink: Arc<dyn EventSink>) -> WorkflowEngine {
        WorkflowEngine::new(
            Arc::new(self.store.clone()),
            sink,
            Arc::new(self.directory.clone()),
            Arc::new(SteppingClock::new(self.now, Duration::seconds(1))),
        )
    }
}

impl Default for WorkflowTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
