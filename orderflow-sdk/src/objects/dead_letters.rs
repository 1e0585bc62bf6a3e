//! Response body of `GET /dead-letters`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State of a dead-letter alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmStatus {
    Ok,
    Alarm,
}

/// A message parked in a dead-letter channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterMessage {
    pub message_id: Uuid,
    pub body: String,
}

/// Dead-letter state of one consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterReport {
    pub consumer: String,
    pub channel: String,
    pub depth: usize,
    pub alarm: AlarmStatus,
    /// The oldest parked messages, at most ten.
    pub messages: Vec<DeadLetterMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLettersResponse {
    pub dead_letters: Vec<DeadLetterReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_status_wire_names() {
        assert_eq!(serde_json::to_string(&AlarmStatus::Alarm).unwrap(), r#""ALARM""#);
        assert_eq!(serde_json::to_string(&AlarmStatus::Ok).unwrap(), r#""OK""#);
        let parsed: AlarmStatus = serde_json::from_str(r#""OK""#).unwrap();
        assert_eq!(parsed, AlarmStatus::Ok);
    }
}
