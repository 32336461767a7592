//! 複数の配信先への同報

use std::sync::Arc;

use async_trait::async_trait;

use super::{EventEnvelope, EventSink};
use crate::error::InfraError;

/// すべての配信先へ同じイベントを届ける
///
/// 1 つでも失敗したら最初のエラーを返す。成功済みの配信先には再送時にもう一度
/// 届くが、購読側の冪等キーで吸収される。
#[derive(Clone, Default)]
pub struct FanOutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanOutEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl EventSink for FanOutEventSink {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), InfraError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.publish(envelope).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
