//! # アウトボックス
//!
//! 保存に成功した遷移のイベントを溜め、イベント配信先へ順に届ける。
//!
//! ## 配信保証
//!
//! - イベントはワークフローの保存が成功した直後に、`await` を挟まずに積む。
//!   保存後に呼び出し元がキャンセルされても、積んだイベントは失われない
//! - 保存に失敗した遷移のイベントが配信されることはない
//! - キューから取り除くのは配信先が受け取った後。配信の途中でキャンセルされた
//!   イベントは先頭に残り、次回の flush で再送する（at-least-once）
//! - 配信に失敗したイベントは先頭に残り、後続のイベントは追い越さない。
//!   [`MAX_DELIVERY_ATTEMPTS`] 回失敗したイベントはデッドレターに移し、後続の配信を続ける
//!
//! ## ロック
//!
//! キューは同期 `Mutex` で保護し、`await` をまたいで保持しない。
//! 配信は別のゲートで 1 つの呼び出しに限る。状態変更操作からの配信は
//! [`Outbox::try_flush`] を使い、他の呼び出しが配信中なら待たずに戻る。
//! 積まれたイベントは配信中の呼び出しが続けて届ける。

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

use docflow_domain::workflow::WorkflowEvent;
use docflow_infra::{
    ActorDirectory,
    event_sink::{EventEnvelope, EventSink},
};
use docflow_shared::{
    event_log::{error, event},
    log_business_event,
};

/// 1 件のイベントの配信を試みる上限回数
pub const MAX_DELIVERY_ATTEMPTS: u32 = 5;

/// 配信待ちがこの件数を超えたら警告する
pub const BACKLOG_WARN_THRESHOLD: usize = 1_000;

/// flush の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// 今回届けたイベント数
    pub delivered:     usize,
    /// 今回デッドレターに移したイベント数
    pub dead_lettered: usize,
    /// キューに残っているイベント数
    pub pending:       usize,
}

struct Entry {
    event:    WorkflowEvent,
    attempts: u32,
}

/// 1 回の配信ループの結果
struct Delivery {
    delivered:     usize,
    dead_lettered: usize,
    stalled:       bool,
}

/// 配信待ちイベントのキュー
#[derive(Default)]
pub struct Outbox {
    queue:        Mutex<VecDeque<Entry>>,
    dead_letters: Mutex<Vec<WorkflowEvent>>,
    delivery:     tokio::sync::Mutex<()>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, events: impl IntoIterator<Item = WorkflowEvent>) {
        let mut queue = self.queue();
        queue.extend(events.into_iter().map(|event| Entry { event, attempts: 0 }));
        if queue.len() > BACKLOG_WARN_THRESHOLD {
            tracing::warn!(
                pending = queue.len(),
                threshold = BACKLOG_WARN_THRESHOLD,
                "配信待ちのイベントが滞留しています"
            );
        }
    }

    /// 先頭から順に配信する
    ///
    /// 他の呼び出しが配信中の場合は、その配信が終わるまで待つ。
    pub async fn flush(&self, sink: &dyn EventSink, directory: &dyn ActorDirectory) -> FlushReport {
        let _delivery = self.delivery.lock().await;
        let delivery = self.deliver(sink, directory).await;
        self.report(delivery.delivered, delivery.dead_lettered)
    }

    /// 他の呼び出しが配信中でなければ配信する
    ///
    /// 配信中だった場合は `None` を返す。積まれたイベントは配信中の呼び出しが届ける。
    pub async fn try_flush(
        &self,
        sink: &dyn EventSink,
        directory: &dyn ActorDirectory,
    ) -> Option<FlushReport> {
        let mut delivered = 0;
        let mut dead_lettered = 0;
        let mut flushed = false;

        loop {
            let Ok(guard) = self.delivery.try_lock() else {
                break;
            };
            let delivery = self.deliver(sink, directory).await;
            drop(guard);

            flushed = true;
            delivered += delivery.delivered;
            dead_lettered += delivery.dead_lettered;
            // ゲートを手放す直前に積まれたイベントを取りこぼさない
            if delivery.stalled || self.is_empty() {
                break;
            }
        }

        flushed.then(|| self.report(delivered, dead_lettered))
    }

    pub fn len(&self) -> usize {
        self.queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }

    /// 配信を諦めたイベント（移した順）
    pub fn dead_letters(&self) -> Vec<WorkflowEvent> {
        self.dead_letters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 配信ゲートを保持した状態で呼ぶ
    async fn deliver(&self, sink: &dyn EventSink, directory: &dyn ActorDirectory) -> Delivery {
        let mut delivery = Delivery {
            delivered:     0,
            dead_lettered: 0,
            stalled:       false,
        };

        while let Some(event) = self.front() {
            let envelope = envelope(event, directory).await;
            match sink.publish(&envelope).await {
                Ok(()) => {
                    self.queue().pop_front();
                    delivery.delivered += 1;
                }
                Err(e) => {
                    let attempts = self.record_failure();
                    tracing::error!(
                        error.category = error::category::INFRASTRUCTURE,
                        error.kind = error::kind::EVENT_DELIVERY,
                        event_kind = %envelope.event.kind(),
                        workflow_id = %envelope.event.workflow_id(),
                        attempts,
                        "イベント配信に失敗しました: {:?}",
                        e
                    );

                    if attempts >= MAX_DELIVERY_ATTEMPTS {
                        self.dead_letter_front();
                        delivery.dead_lettered += 1;
                        log_business_event!(
                            event.category = event::category::DELIVERY,
                            event.action = event::action::OUTBOX_DEAD_LETTERED,
                            event.entity_type = event::entity_type::WORKFLOW,
                            event.entity_id = %envelope.event.workflow_id(),
                            event.result = event::result::FAILURE,
                            event_kind = %envelope.event.kind(),
                            attempts,
                            "イベントをデッドレターに移動"
                        );
                        continue;
                    }

                    log_business_event!(
                        event.category = event::category::DELIVERY,
                        event.action = event::action::OUTBOX_DELIVERY_FAILED,
                        event.entity_type = event::entity_type::WORKFLOW,
                        event.entity_id = %envelope.event.workflow_id(),
                        event.result = event::result::FAILURE,
                        pending = self.len(),
                        "イベント配信を中断"
                    );
                    delivery.stalled = true;
                    break;
                }
            }
        }

        if delivery.delivered > 0 {
            log_business_event!(
                event.category = event::category::DELIVERY,
                event.action = event::action::OUTBOX_FLUSHED,
                event.result = event::result::SUCCESS,
                delivered = delivery.delivered,
                pending = self.len(),
                "イベントを配信"
            );
        }
        delivery
    }

    fn report(&self, delivered: usize, dead_lettered: usize) -> FlushReport {
        FlushReport {
            delivered,
            dead_lettered,
            pending: self.len(),
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Entry>> {
        // 更新は push/pop のみで途中状態を残さないため、poison されても中身を使う
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn front(&self) -> Option<WorkflowEvent> {
        self.queue().front().map(|entry| entry.event.clone())
    }

    /// 先頭の失敗回数を 1 つ増やし、増やした後の値を返す
    fn record_failure(&self) -> u32 {
        let mut queue = self.queue();
        match queue.front_mut() {
            Some(entry) => {
                entry.attempts += 1;
                entry.attempts
            }
            None => 0,
        }
    }

    fn dead_letter_front(&self) {
        let entry = self.queue().pop_front();
        if let Some(entry) = entry {
            self.dead_letters
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(entry.event);
        }
    }
}

/// 担当者のプロフィールを添える
///
/// ディレクトリの障害は表示用情報が欠けるだけなので、警告を出して続行する。
async fn envelope(event: WorkflowEvent, directory: &dyn ActorDirectory) -> EventEnvelope {
    let assignee = match event.step_assignee() {
        Some(actor_id) => match directory.resolve(actor_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(
                    actor_id = %actor_id,
                    "アクターディレクトリの参照に失敗しました: {}",
                    e
                );
                None
            }
        },
        None => None,
    };
    EventEnvelope::new(event).with_assignee(assignee)
}
