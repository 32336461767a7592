//! テストユーティリティ
//!
//! ユースケーステストと統合テストで共有するセットアップ。

mod workflow_test_builder;

pub use workflow_test_builder::WorkflowTestBuilder;
