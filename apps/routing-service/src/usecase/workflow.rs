//! # ワークフローエンジン
//!
//! ワークフローの申請・承認・却下・再送と、その照会を実装する。
//!
//! ## 処理の流れ（状態変更操作）
//!
//! 1. ワークフロー単位のロックを取得
//! 2. ドキュメントストアから読み込み
//! 3. ドメインの純粋な遷移を計算（不変条件の検証を含む）
//! 4. 楽観的ロック付きで保存
//! 5. 保存の直後に（`await` を挟まずに）イベントをアウトボックスに積む
//! 6. イベント配信先へ flush
//!
//! 保存に失敗した場合は 4 の時点でエラーを返す。遷移後の値は捨てられるので、
//! ストア上の状態もイベントも遷移前のまま変わらない。
//! 5 以降で呼び出し元がキャンセルされても、保存済みの遷移のイベントはアウトボックスに残る。
//! 配信の失敗は操作の失敗にしない。イベントはアウトボックスに残り、
//! [`WorkflowEngine::flush_outbox`] で再送する。

mod command;
mod query;

use std::sync::Arc;

use docflow_domain::{
    actor::ActorId,
    clock::Clock,
    value_objects::{DocumentTitle, Version},
    workflow::{Recipient, RoutingType, Workflow, WorkflowEvent, WorkflowId},
};
use docflow_infra::{
    ActorDirectory,
    DocumentStore,
    event_sink::EventSink,
};

use super::{
    helpers::FindResultExt,
    lock::WorkflowLocks,
    outbox::{FlushReport, Outbox},
};
use crate::error::EngineError;

/// ワークフロー申請入力
#[derive(Debug, Clone)]
pub struct SubmitWorkflowInput {
    pub title:        DocumentTitle,
    pub submitted_by: ActorId,
    /// 申請者が指定した順の承認者
    pub recipients:   Vec<Recipient>,
    pub routing_type: RoutingType,
    pub has_bypass:   bool,
}

/// ワークフローエンジン
///
/// 外部の協調者（ドキュメントストア、イベント配信先、アクターディレクトリ、時刻）を
/// `Arc<dyn Trait>` で受け取る。
pub struct WorkflowEngine {
    store:     Arc<dyn DocumentStore>,
    sink:      Arc<dyn EventSink>,
    directory: Arc<dyn ActorDirectory>,
    clock:     Arc<dyn Clock>,
    locks:     WorkflowLocks,
    outbox:    Outbox,
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        sink: Arc<dyn EventSink>,
        directory: Arc<dyn ActorDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            sink,
            directory,
            clock,
            locks: WorkflowLocks::new(),
            outbox: Outbox::new(),
        }
    }

    /// 配信待ちのイベントを再送する
    ///
    /// 他の呼び出しが配信中の場合は、その配信が終わるのを待ってから続きを届ける。
    pub async fn flush_outbox(&self) -> FlushReport {
        self.outbox
            .flush(self.sink.as_ref(), self.directory.as_ref())
            .await
    }

    /// 配信待ちのイベント数
    pub fn pending_events(&self) -> usize {
        self.outbox.len()
    }

    /// 配信を諦めたイベント
    pub fn dead_lettered_events(&self) -> Vec<WorkflowEvent> {
        self.outbox.dead_letters()
    }

    async fn load(&self, workflow_id: &WorkflowId) -> Result<Workflow, EngineError> {
        self.store
            .find_by_id(workflow_id)
            .await
            .or_not_found(workflow_id)
    }

    /// 楽観的ロック付きで保存する
    async fn save(&self, workflow: &Workflow, expected_version: Version) -> Result<(), EngineError> {
        self.store
            .update_with_version_check(workflow, expected_version)
            .await
            .map_err(|e| EngineError::from_store(workflow.id(), e))
    }

    /// 保存済みの遷移のイベントをアウトボックスに積む
    ///
    /// 保存の直後に `await` を挟まずに呼ぶ。
    fn record(&self, events: Vec<WorkflowEvent>) {
        if !events.is_empty() {
            self.outbox.enqueue(events);
        }
    }

    /// アウトボックスを配信する
    ///
    /// 別のワークフローの操作が配信中なら待たない。積んだイベントはその操作が届ける。
    async fn deliver(&self) {
        let Some(report) = self
            .outbox
            .try_flush(self.sink.as_ref(), self.directory.as_ref())
            .await
        else {
            tracing::debug!("他の操作が配信中のため配信を任せます");
            return;
        };
        if report.pending > 0 {
            tracing::warn!(
                pending = report.pending,
                "未配信のイベントがアウトボックスに残っています"
            );
        }
    }
}
