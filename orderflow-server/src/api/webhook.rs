//! `POST /webhook`: the only write entry point of the pipeline.

use axum::body::Bytes;
use axum::extract::State;
use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};
use orderflow_core::processors::GatewayError;
use orderflow_sdk::objects::{
    MSG_ACCEPTED, MSG_FORBIDDEN, MSG_INTERNAL_ERROR, MSG_MISSING_FIELDS, MessageResponse,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(receive_webhook))
}

/// Takes the raw body so a malformed payload is reported as a server error
/// rather than axum's default rejection.
async fn receive_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    state.gateway.accept(&body).await?;
    Ok((StatusCode::OK, Json(MessageResponse::new(MSG_ACCEPTED))))
}

#[derive(Debug)]
pub struct WebhookApiError(GatewayError);

impl From<GatewayError> for WebhookApiError {
    fn from(value: GatewayError) -> Self {
        Self(value)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self.0 {
            GatewayError::Authentication => (StatusCode::FORBIDDEN, MSG_FORBIDDEN),
            GatewayError::Validation => (StatusCode::BAD_REQUEST, MSG_MISSING_FIELDS),
            e @ (GatewayError::MalformedBody(_)
            | GatewayError::DependencyUnavailable(_)
            | GatewayError::Publish(_)) => {
                tracing::error!(error = %e, "Webhook processing failed");
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL_ERROR)
            }
        };
        (status, Json(MessageResponse::new(message))).into_response()
    }
}
