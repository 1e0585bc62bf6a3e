//! `GET /dead-letters`: operator view of the dead-letter channels.

use axum::extract::State;
use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};
use orderflow_core::channel::ChannelError;
use orderflow_sdk::objects::{DeadLetterMessage, DeadLetterReport, DeadLettersResponse};

use crate::state::AppState;

/// Messages shown per dead-letter channel.
const PEEK_LIMIT: usize = 10;

pub fn router() -> Router<AppState> {
    Router::new().route("/dead-letters", get(list_dead_letters))
}

/// Peeking does not count as a receive, so inspection never changes what
/// the monitor sees.
async fn list_dead_letters(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, DeadLettersApiError> {
    let mut dead_letters = Vec::new();
    for watched in state.pipeline.dead_letters() {
        let depth = watched.channel.depth().await?;
        let messages = watched
            .channel
            .peek_messages(PEEK_LIMIT)
            .await?
            .into_iter()
            .map(|m| DeadLetterMessage {
                message_id: m.message_id,
                body: m.body,
            })
            .collect();
        dead_letters.push(DeadLetterReport {
            alarm: state.alarms.get(&watched.consumer).await.into(),
            channel: watched.channel.name().to_string(),
            consumer: watched.consumer,
            depth: depth.total(),
            messages,
        });
    }
    Ok(Json(DeadLettersResponse { dead_letters }))
}

#[derive(Debug)]
struct DeadLettersApiError(ChannelError);

impl From<ChannelError> for DeadLettersApiError {
    fn from(value: ChannelError) -> Self {
        Self(value)
    }
}

impl IntoResponse for DeadLettersApiError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!(error = %self.0, "Failed to inspect dead-letter channel");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
    }
}
