//! # 操作
//!
//! 承認者がワークフローに対して行う承認・却下の入力。

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::WorkflowId;
use crate::{DomainError, actor::ActorId};

/// 操作の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActionKind {
    Approve,
    Reject,
}

impl std::str::FromStr for ActionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(DomainError::Validation(format!("不正な操作種別: {}", s))),
        }
    }
}

/// 承認・却下の操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub workflow_id: WorkflowId,
    pub actor_id:    ActorId,
    pub kind:        ActionKind,
    pub comment:     Option<String>,
}

impl Action {
    pub fn approve(workflow_id: WorkflowId, actor_id: ActorId) -> Self {
        Self {
            workflow_id,
            actor_id,
            kind: ActionKind::Approve,
            comment: None,
        }
    }

    pub fn reject(workflow_id: WorkflowId, actor_id: ActorId) -> Self {
        Self {
            workflow_id,
            actor_id,
            kind: ActionKind::Reject,
            comment: None,
        }
    }

    /// コメントを付与する（空白のみのコメントは付けない）
    pub fn with_comment(self, comment: impl Into<String>) -> Self {
        let comment = comment.into();
        let comment = comment.trim();
        Self {
            comment: (!comment.is_empty()).then(|| comment.to_string()),
            ..self
        }
    }
}
