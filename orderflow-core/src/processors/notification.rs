use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{ConsumerError, MessageHandler, decode_reference};
use crate::channel::ReceivedMessage;
use crate::config::NotificationConfig;
use crate::mailer::{EmailMessage, Mailer};

/// Sends one confirmation email per order event.
///
/// Redelivery sends the email again.
pub struct NotificationConsumer {
    mailer: Arc<dyn Mailer>,
    config: NotificationConfig,
}

impl NotificationConsumer {
    pub fn new(mailer: Arc<dyn Mailer>, config: NotificationConfig) -> Self {
        Self { mailer, config }
    }

    fn confirmation(&self, order_id: &str) -> EmailMessage {
        EmailMessage {
            from: self.config.sender.clone(),
            to: self.config.recipient.clone(),
            subject: format!("Order Confirmation - {order_id}"),
            text_body: format!("Your order {order_id} has been successfully processed."),
            html_body: format!(
                "<html><body><h1>Order Confirmation</h1>\
                 <p>Your order <strong>{order_id}</strong> has been successfully processed.</p>\
                 </body></html>"
            ),
        }
    }
}

#[async_trait]
impl MessageHandler for NotificationConsumer {
    fn name(&self) -> &str {
        "notification"
    }

    async fn handle(&self, message: &ReceivedMessage) -> Result<(), ConsumerError> {
        let event = decode_reference(message)?;
        let email = self.confirmation(&event.order_id);
        let mail_id = self.mailer.send_email(&email).await?;
        info!(
            order_id = %event.order_id,
            %mail_id,
            "Confirmation email sent"
        );
        Ok(())
    }
}
