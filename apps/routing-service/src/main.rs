//! # Routing Service サーバー
//!
//! 文書承認の回付（順次・逆順・並列・双方向）を実行する内部サービス。
//!
//! ## 役割
//!
//! - **回付**: 申請、承認・却下、バイパスされた承認者への再送
//! - **照会**: ワークフローの進捗、アクターごとの受信箱、申請一覧
//! - **イベントストリーム**: UI 更新用に `GET /internal/events` で SSE を配信
//! - **ドメインイベント**: 通知配信・監査ログ・UI 更新へのイベント配信
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `ROUTING_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `ROUTING_PORT` | No | ポート番号（デフォルト: `3100`） |
//! | `LOG_FORMAT` | No | `json` または `pretty`（デフォルト: `pretty`） |
//! | `ACTOR_DIRECTORY_PATH` | No | アクターディレクトリのシード JSON |
//! | `EVENT_BROADCAST_CAPACITY` | No | UI 更新用チャネルの容量（デフォルト: `256`） |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境
//! cargo run -p docflow-routing-service
//!
//! # 本番環境
//! LOG_FORMAT=json ACTOR_DIRECTORY_PATH=/etc/docflow/actors.json \
//!   cargo run -p docflow-routing-service --release
//! ```

use std::sync::Arc;

use anyhow::Context as _;
use docflow_domain::clock::SystemClock;
use docflow_infra::{
    ActorDirectory,
    InMemoryActorDirectory,
    InMemoryDocumentStore,
    event_sink::{BroadcastEventSink, FanOutEventSink, TracingEventSink},
};
use docflow_routing_service::{
    config::RoutingServiceConfig,
    handler::{WorkflowState, router},
    usecase::WorkflowEngine,
};
use docflow_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Routing Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // 設定読み込み（トレーシング初期化前なのでエラーは anyhow で返す）
    let config = RoutingServiceConfig::from_env().context("設定の読み込みに失敗しました")?;

    let tracing_config = TracingConfig::new("routing-service", config.log_format);
    init_tracing(&tracing_config);

    tracing::info!(
        service = %tracing_config.service_name,
        "Routing Service サーバーを起動します: {}",
        config.bind_address()
    );

    // アクターディレクトリ
    let directory = match &config.actor_directory_path {
        Some(path) => InMemoryActorDirectory::from_json_file(path)
            .with_context(|| format!("アクターディレクトリの読み込みに失敗しました: {}", path.display()))?,
        None => InMemoryActorDirectory::default(),
    };
    tracing::info!(actors = directory.len(), "アクターディレクトリを読み込みました");

    // イベント配信先（ビジネスイベントログ + UI 更新用 broadcast）
    let events = BroadcastEventSink::new(config.event_broadcast_capacity);
    let sink = FanOutEventSink::default()
        .with(Arc::new(TracingEventSink::new()))
        .with(Arc::new(events.clone()));

    let engine = WorkflowEngine::new(
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(sink),
        Arc::new(directory) as Arc<dyn ActorDirectory>,
        Arc::new(SystemClock),
    );
    let state = Arc::new(WorkflowState { engine, events });

    // ルーター構築
    let app = router(state).layer(TraceLayer::new_for_http());

    // サーバー起動
    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Routing Service サーバーが起動しました: {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
