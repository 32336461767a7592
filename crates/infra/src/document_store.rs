//! # DocumentStore
//!
//! ワークフローの永続化を担当する。
//!
//! ## 設計方針
//!
//! - **楽観的ロック**: 更新は期待バージョンと一致する場合のみ反映する。
//!   不一致は [`InfraErrorKind::VersionConflict`](crate::error::InfraErrorKind::VersionConflict) として返し、
//!   ユースケース層で同時更新エラーに変換する
//! - **集約単位の保存**: ステップ列・ステータス・バージョンはワークフローと一緒に
//!   1 回の書き込みで保存する。部分的な保存は起こらない
//! - **インメモリ実装**: プロセス内の `HashMap` を `RwLock` で保護する。
//!   永続ストアへの差し替えはトレイト実装を追加するだけで済む

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use docflow_domain::{
    actor::ActorId,
    value_objects::Version,
    workflow::{Workflow, WorkflowId},
};
use tokio::sync::RwLock;

use crate::error::InfraError;

/// ワークフローストアトレイト
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 新規ワークフローを保存する
    ///
    /// 同じ ID が既に存在する場合は `AlreadyExists` を返す。
    async fn insert(&self, workflow: &Workflow) -> Result<(), InfraError>;

    /// 楽観的ロック付きでワークフローを更新する
    ///
    /// ストア上のバージョンが `expected_version` と一致しない場合は `VersionConflict`、
    /// 保存されていない場合は `Missing` を返す。
    async fn update_with_version_check(
        &self,
        workflow: &Workflow,
        expected_version: Version,
    ) -> Result<(), InfraError>;

    /// ID でワークフローを検索する
    async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<Workflow>, InfraError>;

    /// 指定アクターが承認者として含まれるワークフローを作成日時順で取得する
    async fn find_by_recipient(&self, actor_id: &ActorId) -> Result<Vec<Workflow>, InfraError>;

    /// 指定アクターが申請したワークフローを作成日時順で取得する
    async fn find_by_submitter(&self, actor_id: &ActorId) -> Result<Vec<Workflow>, InfraError>;
}

/// インメモリのワークフローストア
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    workflows: Arc<RwLock<HashMap<WorkflowId, Workflow>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn collect_sorted(&self, predicate: impl Fn(&Workflow) -> bool) -> Vec<Workflow> {
        let workflows = self.workflows.read().await;
        let mut matched: Vec<Workflow> = workflows
            .values()
            .filter(|w| predicate(w))
            .cloned()
            .collect();
        matched.sort_by_key(|w| (w.created_at(), *w.id().as_uuid()));
        matched
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    #[tracing::instrument(skip_all, level = "debug", fields(workflow_id = %workflow.id()))]
    async fn insert(&self, workflow: &Workflow) -> Result<(), InfraError> {
        let mut workflows = self.workflows.write().await;
        if workflows.contains_key(workflow.id()) {
            return Err(InfraError::already_exists(workflow.id().clone()));
        }
        workflows.insert(workflow.id().clone(), workflow.clone());
        Ok(())
    }

    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(workflow_id = %workflow.id(), %expected_version)
    )]
    async fn update_with_version_check(
        &self,
        workflow: &Workflow,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        let mut workflows = self.workflows.write().await;
        let Some(stored) = workflows.get_mut(workflow.id()) else {
            return Err(InfraError::missing(workflow.id().clone()));
        };
        if stored.version() != expected_version {
            return Err(InfraError::version_conflict(
                workflow.id().clone(),
                expected_version,
                stored.version(),
            ));
        }
        *stored = workflow.clone();
        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<Workflow>, InfraError> {
        Ok(self.workflows.read().await.get(id).cloned())
    }

    async fn find_by_recipient(&self, actor_id: &ActorId) -> Result<Vec<Workflow>, InfraError> {
        Ok(self.collect_sorted(|w| w.is_recipient(actor_id)).await)
    }

    async fn find_by_submitter(&self, actor_id: &ActorId) -> Result<Vec<Workflow>, InfraError> {
        Ok(self.collect_sorted(|w| w.submitted_by() == actor_id).await)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use docflow_domain::{
        value_objects::{DocumentTitle, StepName},
        workflow::{Action, NewWorkflow, Recipient, RoutingType},
    };
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::error::InfraErrorKind;

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn submit(submitted_by: &ActorId, recipients: &[ActorId], now: DateTime<Utc>) -> Workflow {
        Workflow::submit(NewWorkflow {
            id: WorkflowId::new(),
            title: DocumentTitle::new("出張申請").unwrap(),
            submitted_by: submitted_by.clone(),
            recipients: recipients
                .iter()
                .map(|actor_id| Recipient {
                    actor_id:  actor_id.clone(),
                    step_name: StepName::new("Review").unwrap(),
                })
                .collect(),
            routing_type: RoutingType::Sequential,
            has_bypass: false,
            now,
        })
        .unwrap()
        .workflow
    }

    #[rstest]
    #[tokio::test]
    async fn test_insertしたワークフローをidで取得できる(now: DateTime<Utc>) {
        let store = InMemoryDocumentStore::new();
        let workflow = submit(&ActorId::new(), &[ActorId::new()], now);

        store.insert(&workflow).await.unwrap();

        let found = store.find_by_id(workflow.id()).await.unwrap();
        assert_eq!(found, Some(workflow));
    }

    #[rstest]
    #[tokio::test]
    async fn test_同じidのinsertはduplicate(now: DateTime<Utc>) {
        let store = InMemoryDocumentStore::new();
        let workflow = submit(&ActorId::new(), &[ActorId::new()], now);
        store.insert(&workflow).await.unwrap();

        let err = store.insert(&workflow).await.unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::AlreadyExists(_)));
    }

    #[rstest]
    #[tokio::test]
    async fn test_期待バージョンが一致すれば更新される(now: DateTime<Utc>) {
        let store = InMemoryDocumentStore::new();
        let approver = ActorId::new();
        let workflow = submit(&ActorId::new(), &[approver.clone()], now);
        store.insert(&workflow).await.unwrap();
        let expected = workflow.version();

        let updated = workflow
            .clone()
            .apply(&Action::approve(workflow.id().clone(), approver), now)
            .unwrap()
            .workflow;
        store
            .update_with_version_check(&updated, expected)
            .await
            .unwrap();

        let found = store.find_by_id(updated.id()).await.unwrap().unwrap();
        assert_eq!(found.version(), expected.next());
    }

    #[rstest]
    #[tokio::test]
    async fn test_期待バージョンが古いとconflict(now: DateTime<Utc>) {
        let store = InMemoryDocumentStore::new();
        let approver = ActorId::new();
        let workflow = submit(&ActorId::new(), &[approver.clone()], now);
        store.insert(&workflow).await.unwrap();

        let updated = workflow
            .clone()
            .apply(&Action::approve(workflow.id().clone(), approver), now)
            .unwrap()
            .workflow;
        let stale = updated.version();

        let err = store
            .update_with_version_check(&updated, stale)
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        let found = store.find_by_id(workflow.id()).await.unwrap().unwrap();
        assert_eq!(found, workflow);
    }

    #[rstest]
    #[tokio::test]
    async fn test_存在しないワークフローの更新はnot_found(now: DateTime<Utc>) {
        let store = InMemoryDocumentStore::new();
        let workflow = submit(&ActorId::new(), &[ActorId::new()], now);

        let err = store
            .update_with_version_check(&workflow, workflow.version())
            .await
            .unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::Missing(_)));
    }

    #[rstest]
    #[tokio::test]
    async fn test_承認者と申請者で検索できる(now: DateTime<Utc>) {
        let store = InMemoryDocumentStore::new();
        let submitter = ActorId::new();
        let approver = ActorId::new();
        let first = submit(&submitter, &[approver.clone()], now);
        let second = submit(&submitter, &[approver.clone(), ActorId::new()], now + Duration::minutes(1));
        let unrelated = submit(&ActorId::new(), &[ActorId::new()], now);
        for workflow in [&second, &unrelated, &first] {
            store.insert(workflow).await.unwrap();
        }

        let by_recipient = store.find_by_recipient(&approver).await.unwrap();
        let by_submitter = store.find_by_submitter(&submitter).await.unwrap();

        assert_eq!(by_recipient, vec![first.clone(), second.clone()]);
        assert_eq!(by_submitter, vec![first, second]);
        assert!(store.find_by_recipient(&submitter).await.unwrap().is_empty());
    }
}
