//! ワークフローエンジンの照会操作
//!
//! 進捗率と現在のステージは [`Workflow::progress`] で読み出しのたびに再計算される。

use docflow_domain::{
    actor::ActorId,
    workflow::{Workflow, WorkflowId},
};

use super::WorkflowEngine;
use crate::error::EngineError;

impl WorkflowEngine {
    #[tracing::instrument(skip_all, level = "debug", fields(%workflow_id))]
    pub async fn get(&self, workflow_id: &WorkflowId) -> Result<Workflow, EngineError> {
        self.load(workflow_id).await
    }

    /// 指定アクターが承認者として含まれるワークフロー
    #[tracing::instrument(skip_all, level = "debug", fields(%actor_id))]
    pub async fn list_by_recipient(&self, actor_id: &ActorId) -> Result<Vec<Workflow>, EngineError> {
        self.store
            .find_by_recipient(actor_id)
            .await
            .map_err(EngineError::Persistence)
    }

    /// 指定アクターの判断待ちステップがあるワークフロー（受信箱）
    #[tracing::instrument(skip_all, level = "debug", fields(%actor_id))]
    pub async fn pending_for_actor(&self, actor_id: &ActorId) -> Result<Vec<Workflow>, EngineError> {
        let workflows = self.list_by_recipient(actor_id).await?;
        Ok(workflows
            .into_iter()
            .filter(|w| w.is_awaiting(actor_id))
            .collect())
    }

    /// 指定アクターが申請したワークフロー
    #[tracing::instrument(skip_all, level = "debug", fields(%actor_id))]
    pub async fn list_by_submitter(&self, actor_id: &ActorId) -> Result<Vec<Workflow>, EngineError> {
        self.store
            .find_by_submitter(actor_id)
            .await
            .map_err(EngineError::Persistence)
    }
}

#[cfg(test)]
mod tests {
    use docflow_domain::workflow::{Action, RoutingType};
    use pretty_assertions::assert_eq;

    use crate::test_utils::WorkflowTestBuilder;

    #[tokio::test]
    async fn test_受信箱には判断待ちのワークフローだけが含まれる() {
        let builder = WorkflowTestBuilder::new();
        let sut = builder.build_engine();
        let recipients = builder.actors(2);
        let (a, b) = (&recipients[0], &recipients[1]);
        let sequential = sut
            .submit(builder.submit_input(&[a.clone(), b.clone()], RoutingType::Sequential, false))
            .await
            .unwrap();
        let parallel = sut
            .submit(builder.submit_input(&[b.clone()], RoutingType::Parallel, false))
            .await
            .unwrap();

        let for_b = sut.pending_for_actor(b).await.unwrap();
        let ids: Vec<_> = for_b.iter().map(|w| w.id().clone()).collect();
        assert_eq!(ids, vec![parallel.id().clone()]);

        sut.apply(
            sequential.id(),
            &Action::approve(sequential.id().clone(), a.clone()),
        )
        .await
        .unwrap();

        let for_b = sut.pending_for_actor(b).await.unwrap();
        assert_eq!(for_b.len(), 2);
        assert!(sut.pending_for_actor(a).await.unwrap().is_empty());
        assert_eq!(sut.list_by_recipient(a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_申請者で検索できる() {
        let builder = WorkflowTestBuilder::new();
        let sut = builder.build_engine();
        let recipients = builder.actors(1);
        let submitted = sut
            .submit(builder.submit_input(&recipients, RoutingType::Parallel, false))
            .await
            .unwrap();

        let mine = sut.list_by_submitter(builder.submitter()).await.unwrap();

        assert_eq!(mine, vec![submitted]);
        assert!(sut.list_by_submitter(&recipients[0]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_取得した進捗はステップから再計算される() {
        let builder = WorkflowTestBuilder::new();
        let sut = builder.build_engine();
        let recipients = builder.actors(3);
        let submitted = sut
            .submit(builder.submit_input(&recipients, RoutingType::Parallel, false))
            .await
            .unwrap();
        sut.apply(
            submitted.id(),
            &Action::approve(submitted.id().clone(), recipients[1].clone()),
        )
        .await
        .unwrap();

        let workflow = sut.get(submitted.id()).await.unwrap();

        assert_eq!(workflow.progress().percent, 33);
        assert_eq!(
            workflow.progress().stage.to_string(),
            "All Recipients Review (2/3 remaining)"
        );
    }
}
