//! # テスト用モック
//!
//! ユースケーステストで使用する、失敗を注入できるドキュメントストアと配信先。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! docflow-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use docflow_domain::{
    actor::ActorId,
    value_objects::Version,
    workflow::{Workflow, WorkflowId},
};
use tokio::sync::Barrier;

use crate::{
    document_store::{DocumentStore, InMemoryDocumentStore},
    error::InfraError,
    event_sink::{EventEnvelope, EventSink, RecordingEventSink},
};

// ===== MockDocumentStore =====

/// 失敗を注入できるドキュメントストア
///
/// 保存の実体は [`InMemoryDocumentStore`] に委譲する。
#[derive(Clone, Default)]
pub struct MockDocumentStore {
    inner:            InMemoryDocumentStore,
    update_failures:  Arc<Mutex<usize>>,
    update_conflicts: Arc<Mutex<usize>>,
    update_calls:     Arc<Mutex<usize>>,
    load_barrier:     Arc<Mutex<Option<Arc<Barrier>>>>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 次の `count` 回の更新を `Unexpected` エラーで失敗させる
    pub fn fail_next_updates(&self, count: usize) {
        *self.update_failures.lock().unwrap() = count;
    }

    /// 次の `count` 回の更新を `VersionConflict` エラーで失敗させる
    pub fn conflict_next_updates(&self, count: usize) {
        *self.update_conflicts.lock().unwrap() = count;
    }

    /// `find_by_id` の完了を、`parties` 件の読み込みが揃うまで待たせる
    ///
    /// 複数の呼び出し元が同じバージョンを読んだ状態から保存を競わせるために使う。
    pub fn synchronize_loads(&self, parties: usize) {
        *self.load_barrier.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
    }

    /// 失敗したものも含む更新の呼び出し回数
    pub fn update_calls(&self) -> usize {
        *self.update_calls.lock().unwrap()
    }
}

/// 注入した失敗回数が残っていれば 1 つ消費して `true` を返す
fn take_injected(counter: &Mutex<usize>) -> bool {
    let mut remaining = counter.lock().unwrap();
    if *remaining == 0 {
        return false;
    }
    *remaining -= 1;
    true
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn insert(&self, workflow: &Workflow) -> Result<(), InfraError> {
        self.inner.insert(workflow).await
    }

    async fn update_with_version_check(
        &self,
        workflow: &Workflow,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        *self.update_calls.lock().unwrap() += 1;

        if take_injected(&self.update_failures) {
            return Err(InfraError::unexpected("注入された保存エラー"));
        }
        if take_injected(&self.update_conflicts) {
            return Err(InfraError::version_conflict(
                workflow.id().clone(),
                expected_version,
                expected_version.next(),
            ));
        }
        self.inner
            .update_with_version_check(workflow, expected_version)
            .await
    }

    async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<Workflow>, InfraError> {
        let found = self.inner.find_by_id(id).await?;
        let barrier = self.load_barrier.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
        Ok(found)
    }

    async fn find_by_recipient(&self, actor_id: &ActorId) -> Result<Vec<Workflow>, InfraError> {
        self.inner.find_by_recipient(actor_id).await
    }

    async fn find_by_submitter(&self, actor_id: &ActorId) -> Result<Vec<Workflow>, InfraError> {
        self.inner.find_by_submitter(actor_id).await
    }
}

// ===== FailingEventSink =====

/// 最初の `failures` 回の配信を失敗させ、それ以降は記録する配信先
#[derive(Clone, Default)]
pub struct FailingEventSink {
    remaining_failures: Arc<Mutex<usize>>,
    attempts:           Arc<Mutex<usize>>,
    delivered:          Arc<Mutex<Vec<EventEnvelope>>>,
}

impl FailingEventSink {
    pub fn new(failures: usize) -> Self {
        Self {
            remaining_failures: Arc::new(Mutex::new(failures)),
            ..Self::default()
        }
    }

    /// 以降の `count` 回の配信を失敗させる
    pub fn fail_next(&self, count: usize) {
        *self.remaining_failures.lock().unwrap() = count;
    }

    /// 配信に成功したイベント（重複除去なし）
    pub fn delivered(&self) -> Vec<EventEnvelope> {
        self.delivered.lock().unwrap().clone()
    }

    /// 失敗したものも含む配信の試行回数
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl EventSink for FailingEventSink {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), InfraError> {
        *self.attempts.lock().unwrap() += 1;

        if take_injected(&self.remaining_failures) {
            return Err(InfraError::event_delivery("注入された配信エラー"));
        }
        self.delivered.lock().unwrap().push(envelope.clone());
        Ok(())
    }
}

// ===== DelayedEventSink =====

/// 毎回 `delay` だけ待ってから記録用の配信先へ渡す配信先
///
/// 遅い購読者や、配信の途中で呼び出し元がキャンセルされる状況を再現する。
#[derive(Clone)]
pub struct DelayedEventSink {
    delay: Duration,
    inner: RecordingEventSink,
}

impl DelayedEventSink {
    pub fn new(delay: Duration, inner: RecordingEventSink) -> Self {
        Self { delay, inner }
    }
}

#[async_trait]
impl EventSink for DelayedEventSink {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), InfraError> {
        tokio::time::sleep(self.delay).await;
        self.inner.publish(envelope).await
    }
}
