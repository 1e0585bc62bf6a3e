use reqwest::Client;
use serde_json::Number;
use url::Url;

use super::ClientError;
use crate::objects::{MessageResponse, WebhookRequest};

/// Typed HTTP client for `POST /webhook`.
///
/// The API key travels inside the JSON body, next to the order fields.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl WebhookClient {
    /// * `base_url` – root URL of the server (e.g. `https://orders.example.com`).
    /// * `api_key` – the shared webhook API key.
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            api_key: api_key.into(),
        }
    }

    /// Replace the default `reqwest::Client` (timeouts, proxy, …).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Submit one order-created webhook.
    ///
    /// The server does not deduplicate, so retrying a call that actually
    /// succeeded produces a second order event downstream.
    pub async fn send_order(
        &self,
        order_id: impl Into<String>,
        amount_total: impl Into<Number>,
    ) -> Result<MessageResponse, ClientError> {
        let body = WebhookRequest {
            order_id: Some(order_id.into()),
            amount_total: Some(amount_total.into()),
            api_key: Some(self.api_key.clone()),
        };
        self.send_raw(&body).await
    }

    /// Submit an arbitrary webhook body as-is.
    pub async fn send_raw(&self, body: &WebhookRequest) -> Result<MessageResponse, ClientError> {
        let url = self.base_url.join("/webhook")?;
        let resp = self.http.post(url).json(body).send().await?;
        parse_response(resp).await
    }
}

async fn parse_response(resp: reqwest::Response) -> Result<MessageResponse, ClientError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if status.is_success() {
        return serde_json::from_slice(&bytes).map_err(ClientError::Json);
    }
    match serde_json::from_slice::<MessageResponse>(&bytes) {
        Ok(MessageResponse { message }) => Err(ClientError::Rejected { status, message }),
        Err(_) => Err(ClientError::Api {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }),
    }
}
