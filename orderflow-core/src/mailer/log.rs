use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{EmailMessage, MailError, Mailer};

/// Transport that only writes the message to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(&self, message: &EmailMessage) -> Result<String, MailError> {
        let message_id = Uuid::new_v4().to_string();
        info!(
            %message_id,
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "Email sent (log transport)"
        );
        Ok(message_id)
    }
}
