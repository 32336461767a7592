//! # ワークフロー単位のロック
//!
//! 同じワークフローへの操作をプロセス内で直列化する。別のワークフローへの操作は
//! 互いに待たない。
//!
//! プロセスをまたぐ同時更新はドキュメントストアの楽観的ロックで検出する。
//! このロックはその前段で、同一プロセス内の競合を待ち合わせに変える。

use std::{collections::HashMap, sync::Arc};

use docflow_domain::workflow::WorkflowId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// ワークフロー ID ごとの非同期ロック
#[derive(Default)]
pub struct WorkflowLocks {
    locks: Mutex<HashMap<WorkflowId, Arc<Mutex<()>>>>,
}

impl WorkflowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定ワークフローのロックを取得する
    ///
    /// ガードを drop するまで、同じワークフローへの `acquire` は待たされる。
    pub async fn acquire(&self, workflow_id: &WorkflowId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // 誰も保持・待機していないロックは捨てる
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(workflow_id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// 保持・待機中のロックの数
    pub async fn active(&self) -> usize {
        self.locks
            .lock()
            .await
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_同じワークフローのロックは解放まで待たされる() {
        let locks = WorkflowLocks::new();
        let id = WorkflowId::new();

        let guard = locks.acquire(&id).await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&id)).await;
        assert!(second.is_err());

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&id)).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_別のワークフローのロックは互いに待たない() {
        let locks = WorkflowLocks::new();

        let _first = locks.acquire(&WorkflowId::new()).await;
        let second =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(&WorkflowId::new())).await;

        assert!(second.is_ok());
        assert_eq!(locks.active().await, 2);
    }

    #[tokio::test]
    async fn test_解放されたロックは次の取得時に掃除される() {
        let locks = WorkflowLocks::new();

        drop(locks.acquire(&WorkflowId::new()).await);
        let _guard = locks.acquire(&WorkflowId::new()).await;

        assert_eq!(locks.locks.lock().await.len(), 1);
    }
}
