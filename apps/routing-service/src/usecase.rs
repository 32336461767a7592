//! # ユースケース層
//!
//! Routing Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: ストア・配信先・ディレクトリ・時刻を `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//! - **遷移はドメインに任せる**: ユースケースは読み込み・保存・配信の順序だけを管理する
//!
//! ## モジュール構成
//!
//! - `workflow`: ワークフローエンジン（申請・承認・再送・照会）
//! - `lock`: ワークフロー単位のロック
//! - `outbox`: 保存済み遷移のイベント配信キュー

pub(crate) mod helpers;

pub mod lock;
pub mod outbox;
pub mod workflow;

pub use outbox::FlushReport;
pub use workflow::{SubmitWorkflowInput, WorkflowEngine};
