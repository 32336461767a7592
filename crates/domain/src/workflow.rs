//! # ワークフロー
//!
//! 文書承認の回付状態を管理する。
//!
//! ## 概念モデル
//!
//! - **Workflow**: 申請された 1 件の文書に対する回付状態（集約）
//! - **Step**: 1 人の担当者に割り当てられた作業単位
//! - **RoutingStrategy**: 回付方式ごとの判定ロジック
//! - **ProgressCalculator**: ステップから進捗率と現在のステージを導出する
//! - **WorkflowEvent**: 遷移の結果として外部に伝える事実
//!
//! ## 使用例
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use docflow_domain::{
//!     actor::ActorId,
//!     value_objects::{DocumentTitle, StepName},
//!     workflow::{
//!         Action, NewWorkflow, Recipient, RoutingType, Workflow, WorkflowId,
//!         WorkflowStatus,
//!     },
//! };
//!
//! let submitter = ActorId::new();
//! let hod = ActorId::new();
//! let now = chrono::Utc::now();
//!
//! let submitted = Workflow::submit(NewWorkflow {
//!     id: WorkflowId::new(),
//!     title: DocumentTitle::new("備品購入申請")?,
//!     submitted_by: submitter,
//!     recipients: vec![Recipient {
//!         actor_id:  hod.clone(),
//!         step_name: StepName::new("HOD Review")?,
//!     }],
//!     routing_type: RoutingType::Sequential,
//!     has_bypass: false,
//!     now,
//! })?;
//!
//! let workflow = submitted.workflow;
//! let action = Action::approve(workflow.id().clone(), hod);
//! let approved = workflow.apply(&action, now)?.workflow;
//! assert_eq!(approved.status(), WorkflowStatus::Approved);
//! assert_eq!(approved.progress().percent, 100);
//! # Ok(())
//! # }
//! ```

mod action;
mod event;
mod instance;
pub mod invariant;
mod progress;
mod routing;
mod step;

pub use action::*;
pub use event::{EventKind, IdempotencyKey, WorkflowEvent};
pub use instance::*;
pub use progress::*;
pub use routing::*;
pub use step::*;
