//! `tokio::sync::broadcast` による配信
//!
//! UI 更新などプロセス内の購読者へイベントを配る。購読者がいない間に
//! 配信されたイベントは捨てる（UI は再表示時に最新状態を取得し直す）。

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{EventEnvelope, EventSink};
use crate::error::InfraError;

/// broadcast チャネルへの配信先
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<EventEnvelope>,
}

impl BroadcastEventSink {
    /// `capacity` を超えて読まれていないイベントは購読者側で `Lagged` になる
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventSink for BroadcastEventSink {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), InfraError> {
        match self.sender.send(envelope.clone()) {
            Ok(receivers) => {
                tracing::trace!(receivers, "イベントをブロードキャスト");
            }
            Err(_) => {
                tracing::trace!("購読者がいないためブロードキャストをスキップ");
            }
        }
        Ok(())
    }
}
