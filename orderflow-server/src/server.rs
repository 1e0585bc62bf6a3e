//! Axum server setup and router configuration.

use crate::api;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::{Json, Router, response::IntoResponse, routing::get};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(api::webhook::router())
        .merge(api::dead_letters::router())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Simple health check - returns OK if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run the server with graceful shutdown support.
pub async fn run_server(router: Router, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use orderflow_core::Pipeline;
    use orderflow_core::channel::{Channel, ChannelPolicy};
    use orderflow_core::processors::{AlarmBoard, DeadLetterMonitor, WebhookGateway};
    use orderflow_core::secrets::StaticSecretProvider;
    use orderflow_sdk::objects::{
        AlarmStatus, DeadLettersResponse, MSG_ACCEPTED, MSG_FORBIDDEN, MSG_INTERNAL_ERROR,
        MSG_MISSING_FIELDS, MessageResponse, decode_order_event,
    };
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;
    use tower::ServiceExt;

    const ARN: &str = "arn:aws:sns:local:000000000000:NewOrdersTopic";

    async fn state_with_topic(gateway_arn: &str, secrets: StaticSecretProvider) -> AppState {
        let pipeline = Pipeline::new(ARN, ChannelPolicy::default()).await;
        let gateway = WebhookGateway::new(Arc::new(secrets), pipeline.topic.clone(), gateway_arn);
        AppState::new(gateway, pipeline, AlarmBoard::new())
    }

    async fn state() -> AppState {
        state_with_topic(ARN, StaticSecretProvider::new().with_secret("API_KEY", "secret")).await
    }

    async fn post_webhook(state: AppState, body: &str) -> (StatusCode, String) {
        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let message: MessageResponse = serde_json::from_slice(&bytes).unwrap();
        (status, message.message)
    }

    async fn queued(state: &AppState) -> Vec<usize> {
        let mut depths = Vec::new();
        for pair in state.pipeline.pairs() {
            depths.push(pair.queue.depth().await.unwrap().total());
        }
        depths
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = build_router(state().await)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_valid_webhook_reaches_every_channel() {
        let state = state().await;
        let (status, message) = post_webhook(
            state.clone(),
            r#"{"order_id":"123","amount_total":100,"api_key":"secret"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(message, MSG_ACCEPTED);
        assert_eq!(queued(&state).await, vec![1, 1, 1]);

        let delivered = state.pipeline.email.queue.peek_messages(1).await.unwrap();
        let event = decode_order_event(&delivered[0].body).unwrap();
        assert_eq!(event.order_id, "123");
    }

    #[tokio::test]
    async fn test_invalid_key_is_forbidden() {
        let state = state().await;
        let (status, message) = post_webhook(
            state.clone(),
            r#"{"order_id":"123","amount_total":100,"api_key":"wrong"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(message, MSG_FORBIDDEN);
        assert_eq!(queued(&state).await, vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn test_wrong_key_with_mistyped_fields_is_forbidden() {
        let state = state().await;
        for body in [
            r#"{"order_id":"1","amount_total":"500","api_key":"wrong"}"#,
            r#"{"order_id":123,"amount_total":1,"api_key":"wrong"}"#,
            r#"{"order_id":"1","amount_total":1,"api_key":42}"#,
        ] {
            let (status, message) = post_webhook(state.clone(), body).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
            assert_eq!(message, MSG_FORBIDDEN);
        }
        assert_eq!(queued(&state).await, vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn test_mistyped_field_after_authentication_is_bad_request() {
        let state = state().await;
        let (status, message) = post_webhook(
            state.clone(),
            r#"{"order_id":"1","amount_total":"500","api_key":"secret"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, MSG_MISSING_FIELDS);
        assert_eq!(queued(&state).await, vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let state = state().await;
        let (status, message) =
            post_webhook(state.clone(), r#"{"order_id":"123","api_key":"secret"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, MSG_MISSING_FIELDS);
        assert_eq!(queued(&state).await, vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn test_malformed_body_is_internal_error() {
        let state = state().await;
        let (status, message) = post_webhook(state.clone(), "{not json").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, MSG_INTERNAL_ERROR);
        assert_eq!(queued(&state).await, vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn test_unknown_topic_is_internal_error() {
        let state = state_with_topic(
            "arn:aws:sns:local:000000000000:Missing",
            StaticSecretProvider::new().with_secret("API_KEY", "secret"),
        )
        .await;
        let (status, message) = post_webhook(
            state.clone(),
            r#"{"order_id":"123","amount_total":100,"api_key":"secret"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, MSG_INTERNAL_ERROR);
        assert_eq!(queued(&state).await, vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn test_missing_secret_is_internal_error() {
        let state = state_with_topic(ARN, StaticSecretProvider::new()).await;
        let (status, _) = post_webhook(
            state,
            r#"{"order_id":"123","amount_total":100,"api_key":"secret"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_dead_letters_report() {
        let state = state().await;
        state
            .pipeline
            .inventory
            .dead_letter
            .send_message("poison".into())
            .await
            .unwrap();
        let (_tx, rx) = watch::channel(false);
        DeadLetterMonitor::new(
            state.pipeline.dead_letters(),
            state.alarms.clone(),
            Duration::from_secs(60),
            rx,
        )
        .evaluate()
        .await;

        let response = build_router(state)
            .oneshot(Request::get("/dead-letters").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let report: DeadLettersResponse = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(report.dead_letters.len(), 3);
        let inventory = report
            .dead_letters
            .iter()
            .find(|r| r.consumer == "inventory")
            .unwrap();
        assert_eq!(inventory.depth, 1);
        assert_eq!(inventory.alarm, AlarmStatus::Alarm);
        assert_eq!(inventory.messages[0].body, "poison");
        let persistence = report
            .dead_letters
            .iter()
            .find(|r| r.consumer == "persistence")
            .unwrap();
        assert_eq!(persistence.depth, 0);
        assert_eq!(persistence.alarm, AlarmStatus::Ok);
    }
}
