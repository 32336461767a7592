//! ユースケース層の共通ヘルパー
//!
//! ドキュメントストア呼び出し結果の変換を共通化する。

use docflow_domain::workflow::WorkflowId;
use docflow_infra::InfraError;

use crate::error::EngineError;

/// ストアの `Result<Option<T>, InfraError>` を `Result<T, EngineError>` に変換する
///
/// ```ignore
/// let workflow = self.store.find_by_id(&id).await.or_not_found(&id)?;
/// ```
pub(crate) trait FindResultExt<T> {
    /// `None` の場合は `WorkflowNotFound`、`InfraError` の場合は `Persistence` を返す
    fn or_not_found(self, workflow_id: &WorkflowId) -> Result<T, EngineError>;
}

impl<T> FindResultExt<T> for Result<Option<T>, InfraError> {
    fn or_not_found(self, workflow_id: &WorkflowId) -> Result<T, EngineError> {
        self.map_err(EngineError::Persistence)?
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_not_found_ok_some_は値を返す() {
        let result: Result<Option<i32>, InfraError> = Ok(Some(42));

        let value = result.or_not_found(&WorkflowId::new()).unwrap();

        assert_eq!(value, 42);
    }

    #[test]
    fn test_or_not_found_ok_none_はworkflow_not_foundを返す() {
        let id = WorkflowId::new();
        let result: Result<Option<i32>, InfraError> = Ok(None);

        let err = result.or_not_found(&id).unwrap_err();

        match err {
            EngineError::WorkflowNotFound(missing) => assert_eq!(missing, id),
            other => panic!("WorkflowNotFound を期待したが {:?} を受信", other),
        }
    }

    #[test]
    fn test_or_not_found_errはpersistenceを返す() {
        let result: Result<Option<i32>, InfraError> = Err(InfraError::unexpected("接続失敗"));

        let err = result.or_not_found(&WorkflowId::new()).unwrap_err();

        assert!(matches!(err, EngineError::Persistence(_)));
    }
}
