pub mod dead_letters;
pub mod envelope;
pub mod order;
pub mod webhook;

pub use dead_letters::{AlarmStatus, DeadLetterMessage, DeadLetterReport, DeadLettersResponse};
pub use envelope::{
    EnvelopeError, MESSAGE_STRUCTURE_JSON, NOTIFICATION_TYPE, Notification, PublishEnvelope,
    decode_order_event, decode_order_reference,
};
pub use order::{OrderEvent, OrderReference};
pub use webhook::{
    MSG_ACCEPTED, MSG_FORBIDDEN, MSG_INTERNAL_ERROR, MSG_MISSING_FIELDS, MessageResponse,
    WebhookRequest,
};
