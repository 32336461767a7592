//! # DocFlow インフラ層
//!
//! 承認ルーティングエンジンが依存する外部コラボレータのインターフェースと実装。
//!
//! ## 設計方針
//!
//! エンジンはこのクレートのトレイトだけに依存する。保存先や配信手段の詳細は
//! トレイト実装に閉じ込め、ドメイン層とユースケース層を差し替えから保護する。
//!
//! ## 責務
//!
//! - **ドキュメントストア**: 楽観的ロック付きのワークフロー保存
//! - **イベント配信**: ドメインイベントの at-least-once 配信
//! - **アクターディレクトリ**: アクター ID から表示用プロフィールの解決
//!
//! ## 依存関係
//!
//! ```text
//! routing-service → infra → domain
//!                     ↓
//!                   shared
//! ```
//!
//! ## モジュール構成
//!
//! - [`actor_directory`] - アクターディレクトリ
//! - [`document_store`] - ワークフローの保存
//! - [`error`] - インフラ層エラー定義
//! - [`event_sink`] - イベント配信
//!
//! ## 使用例
//!
//! ```rust
//! use docflow_infra::{
//!     document_store::{DocumentStore, InMemoryDocumentStore},
//!     event_sink::{EventSink, RecordingEventSink},
//! };
//!
//! let store = InMemoryDocumentStore::new();
//! let sink = RecordingEventSink::new();
//! assert!(sink.events().is_empty());
//! # let _: &dyn DocumentStore = &store;
//! # let _: &dyn EventSink = &sink;
//! ```

pub mod actor_directory;
pub mod document_store;
pub mod error;
pub mod event_sink;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use actor_directory::{ActorDirectory, InMemoryActorDirectory};
pub use document_store::{DocumentStore, InMemoryDocumentStore};
pub use error::{InfraError, InfraErrorKind};
pub use event_sink::{EventEnvelope, EventSink};
