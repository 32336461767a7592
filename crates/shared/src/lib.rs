//! # DocFlow 共有ユーティリティ
//!
//! ワークスペース全体で使用される共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - 他のクレート（infra, routing-service）から依存される
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - axum などのフレームワークには依存しない（HTTP 変換は各サービスの責務）

pub mod api_response;
pub mod error_response;
pub mod event_log;
pub mod health;
pub mod observability;

pub use api_response::ApiResponse;
pub use error_response::ErrorResponse;
pub use health::HealthResponse;
