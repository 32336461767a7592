//! 冪等キーで重複除去する記録用の配信先
//!
//! at-least-once 配信を受ける購読者の振る舞いをそのまま実装したもの。
//! 同じ冪等キーのイベントは 2 回目以降を無視する。

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use docflow_domain::workflow::{IdempotencyKey, WorkflowEvent};

use super::{EventEnvelope, EventSink};
use crate::error::InfraError;

#[derive(Default)]
struct Recorded {
    seen:      HashSet<IdempotencyKey>,
    envelopes: Vec<EventEnvelope>,
}

/// 受け取ったイベントをメモリに記録する配信先
#[derive(Clone, Default)]
pub struct RecordingEventSink {
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 重複除去後のイベント（受信順）
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.lock()
            .envelopes
            .iter()
            .map(|e| e.event.clone())
            .collect()
    }

    pub fn envelopes(&self) -> Vec<EventEnvelope> {
        self.lock().envelopes.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        // 記録は追記のみで途中状態を残さないため、poison されても中身を使う
        self.recorded.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), InfraError> {
        let mut recorded = self.lock();
        if !recorded.seen.insert(envelope.idempotency_key()) {
            tracing::debug!(
                event_kind = %envelope.event.kind(),
                workflow_id = %envelope.event.workflow_id(),
                "重複イベントを無視"
            );
            return Ok(());
        }
        recorded.envelopes.push(envelope.clone());
        Ok(())
    }
}
