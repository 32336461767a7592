//! # イベントストリームハンドラ
//!
//! 配信されたドメインイベントを Server-Sent Events で UI に流す。
//!
//! ## エンドポイント
//!
//! ```text
//! GET /internal/events
//! ```
//!
//! SSE の `event` にイベント種別、`data` に担当者プロフィール付きの JSON を載せる。
//! 購読前に配信されたイベントは届かない。UI は接続時に一覧を取得し直す。

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;

use super::WorkflowState;

/// イベントストリーム
pub async fn stream_events(
    State(state): State<Arc<WorkflowState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.events.subscribe();
    tracing::debug!(
        subscribers = state.events.subscriber_count(),
        "イベントストリームの購読を開始"
    );

    let stream = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(envelope) => {
                    let kind = envelope.event.kind();
                    match Event::default().event(kind.to_string()).json_data(&envelope) {
                        Ok(event) => return Some((Ok(event), receiver)),
                        Err(e) => {
                            tracing::warn!(event_kind = %kind, "イベントのシリアライズに失敗しました: {}", e);
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "イベントストリームの購読者が遅れています");
                    let event = Event::default().comment(format!("lagged: {skipped}"));
                    return Some((Ok(event), receiver));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use docflow_domain::workflow::RoutingType;
    use docflow_infra::event_sink::{BroadcastEventSink, FanOutEventSink};
    use futures_util::StreamExt as _;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::{handler::router, test_utils::WorkflowTestBuilder};

    #[tokio::test]
    async fn test_購読中に配信されたイベントがsseで届く() {
        // Given
        let builder = WorkflowTestBuilder::new();
        let events = BroadcastEventSink::new(16);
        let sink = FanOutEventSink::default()
            .with(Arc::new(builder.sink().clone()))
            .with(Arc::new(events.clone()));
        let state = Arc::new(WorkflowState {
            engine: builder.build_engine_with_sink(Arc::new(sink)),
            events,
        });
        let sut = router(state.clone());

        let response = sut
            .oneshot(
                Request::builder()
                    .uri("/internal/events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        // When
        let recipients = builder.actors(1);
        let workflow = state
            .engine
            .submit(builder.submit_input(&recipients, RoutingType::Sequential, false))
            .await
            .unwrap();

        // Then
        let mut body = response.into_body().into_data_stream();
        let chunk = tokio::time::timeout(Duration::from_secs(1), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(text.contains("event: step_activated"), "{text}");
        assert!(text.contains(&workflow.id().to_string()), "{text}");
    }
}
