//! # DocFlow ドメイン層
//!
//! 文書承認ルーティングの状態機械を定義する。
//!
//! ## 設計方針
//!
//! - **純粋関数**: 状態遷移は I/O を持たず、現在の状態と操作から新しい状態を計算するだけ
//! - **派生値は保存しない**: 進捗率や現在のステージは常にステップから再計算する
//! - **ID による照合**: 担当者の判定はアクター ID の完全一致のみで行う
//!
//! ## 依存関係の方向
//!
//! ```text
//! routing-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（ストア、イベント配信）に一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`actor`] - 申請者・承認者の識別子とプロフィール
//! - [`clock`] - 時刻プロバイダ
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`value_objects`] - バージョン番号・ステップ名などの値オブジェクト
//! - [`workflow`] - ワークフロー、ステップ、回付戦略、進捗計算、ドメインイベント
//!
//! ## 使用例
//!
//! ```rust
//! use docflow_domain::{DomainError, actor::ActorId};
//!
//! let actor_id = ActorId::new();
//! let error = DomainError::ResendNotPermitted { actor_id };
//! assert!(matches!(error, DomainError::ResendNotPermitted { .. }));
//! ```

#[macro_use]
mod macros;

pub mod actor;
pub mod clock;
pub mod error;
pub mod value_objects;
pub mod workflow;

pub use error::DomainError;
