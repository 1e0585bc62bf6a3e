//! Outbound email transport.

pub mod log;
pub mod relay;

pub use log::LogMailer;
pub use relay::HttpRelayMailer;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// A single-recipient email with text and HTML alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail relay rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid mail relay response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Hand one message to the transport. Returns the transport's message id.
    async fn send_email(&self, message: &EmailMessage) -> Result<String, MailError>;
}
