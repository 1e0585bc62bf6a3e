/// Addresses used for order confirmation emails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub sender: String,
    pub recipient: String,
}
