//! # イベント配信
//!
//! ワークフローのドメインイベントを外部の購読者（通知配信・監査ログ・UI 更新）へ届ける。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `EventSink` trait で配信先を抽象化
//! - **at-least-once**: 配信に失敗したイベントは呼び出し元のアウトボックスに残り再送される。
//!   購読側は [`IdempotencyKey`] で重複を除去する
//! - **4 つの実装**:
//!   - [`TracingEventSink`]: ビジネスイベントログとして出力
//!   - [`RecordingEventSink`]: 冪等キーで重複除去してメモリに記録
//!   - [`BroadcastEventSink`]: `tokio::sync::broadcast` で UI 更新の購読者へ配る
//!   - [`FanOutEventSink`]: 複数の配信先へ同じイベントを届ける

mod broadcast;
mod fan_out;
mod logging;
mod recording;

use async_trait::async_trait;
pub use broadcast::BroadcastEventSink;
use docflow_domain::{
    actor::ActorProfile,
    workflow::{IdempotencyKey, WorkflowEvent},
};
pub use fan_out::FanOutEventSink;
pub use logging::TracingEventSink;
pub use recording::RecordingEventSink;
use serde::Serialize;

use crate::error::InfraError;

/// 配信単位
///
/// ドメインイベントに、アクターディレクトリで解決した担当者のプロフィールを添える。
/// プロフィールは表示用で、ディレクトリが知らないアクターでは `None` になる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventEnvelope {
    pub event:    WorkflowEvent,
    pub assignee: Option<ActorProfile>,
}

impl EventEnvelope {
    pub fn new(event: WorkflowEvent) -> Self {
        Self {
            event,
            assignee: None,
        }
    }

    pub fn with_assignee(self, assignee: Option<ActorProfile>) -> Self {
        Self { assignee, ..self }
    }

    pub fn idempotency_key(&self) -> IdempotencyKey {
        self.event.idempotency_key()
    }
}

/// イベント配信トレイト
#[async_trait]
pub trait EventSink: Send + Sync {
    /// イベントを 1 件配信する
    ///
    /// 同じイベントが複数回渡されることがある。
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), InfraError>;
}
