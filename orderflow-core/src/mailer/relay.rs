use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{EmailMessage, MailError, Mailer};

#[derive(Deserialize)]
struct RelayResponse {
    #[serde(rename = "MessageId")]
    message_id: String,
}

/// Posts each message as JSON to an HTTP mail relay.
///
/// The relay answers `{"MessageId": "..."}` on success.
#[derive(Debug, Clone)]
pub struct HttpRelayMailer {
    http: reqwest::Client,
    relay_url: Url,
}

impl HttpRelayMailer {
    pub fn new(relay_url: Url) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            relay_url,
        }
    }

    pub fn relay_url(&self) -> &Url {
        &self.relay_url
    }
}

fn parse_relay_response(status: u16, body: &[u8]) -> Result<String, MailError> {
    if !(200..300).contains(&status) {
        return Err(MailError::Rejected {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        });
    }
    let parsed: RelayResponse =
        serde_json::from_slice(body).map_err(|e| MailError::InvalidResponse(e.to_string()))?;
    Ok(parsed.message_id)
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    async fn send_email(&self, message: &EmailMessage) -> Result<String, MailError> {
        let resp = self
            .http
            .post(self.relay_url.clone())
            .json(message)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        let message_id = parse_relay_response(status, &body)?;
        debug!(%message_id, to = %message.to, "Email accepted by relay");
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let id = parse_relay_response(200, br#"{"MessageId":"abc-1"}"#).unwrap();
        assert_eq!(id, "abc-1");
    }

    #[test]
    fn test_parse_rejected() {
        let err = parse_relay_response(503, b"throttled").unwrap_err();
        assert!(matches!(err, MailError::Rejected { status: 503, .. }));
    }

    #[test]
    fn test_parse_missing_id() {
        let err = parse_relay_response(200, b"{}").unwrap_err();
        assert!(matches!(err, MailError::InvalidResponse(_)));
    }
}
