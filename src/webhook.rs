use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::payload::OutboundPayload;

/// Client-side timeout for a single delivery attempt.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Longest response body kept for diagnostics on a non-2xx reply.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("webhook request timed out")]
    Timeout,

    #[error("webhook request failed")]
    Transport(#[source] reqwest::Error),

    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to encode payload")]
    Encode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DeliveryError::Timeout
        } else {
            DeliveryError::Transport(err)
        }
    }
}

impl DeliveryError {
    /// The error followed by every underlying cause, joined with `: `.
    pub fn report(&self) -> String {
        let mut rendered = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }
}

/// Destination for forwarded payloads. One call is one delivery attempt.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn deliver(&self, payload: &OutboundPayload) -> Result<(), DeliveryError>;
}

/// Posts payloads as JSON to a fixed webhook URL.
pub struct WebhookClient {
    client: reqwest::Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DELIVERY_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl WebhookSink for WebhookClient {
    async fn deliver(&self, payload: &OutboundPayload) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(payload)?;

        debug!("Posting {} bytes to webhook", body.len());

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY).to_string(),
            });
        }

        Ok(())
    }
}

fn truncate(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{PayloadAttachment, PayloadAuthor, PayloadMention};
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct Receiver {
        status: StatusCode,
        delay: Duration,
        requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    async fn record(
        State(receiver): State<Receiver>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, &'static str) {
        tokio::time::sleep(receiver.delay).await;
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        receiver.requests.lock().await.push((content_type, body));
        (receiver.status, "upstream exploded")
    }

    async fn spawn_receiver(status: StatusCode, delay: Duration) -> (String, Receiver) {
        let receiver = Receiver {
            status,
            delay,
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let app = Router::new()
            .route("/webhook/discord-trigger", post(record))
            .with_state(receiver.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/webhook/discord-trigger", addr), receiver)
    }

    fn payload() -> OutboundPayload {
        OutboundPayload {
            content: "<@777> hello".to_string(),
            author: PayloadAuthor {
                id: "42".to_string(),
                username: "alice".to_string(),
                discriminator: "0".to_string(),
                global_name: None,
            },
            channel_id: "2".to_string(),
            guild_id: "1".to_string(),
            message_id: "3".to_string(),
            mentions: vec![PayloadMention {
                id: "777".to_string(),
                username: "relaybot".to_string(),
            }],
            attachments: vec![PayloadAttachment {
                id: "9".to_string(),
                name: "a.png".to_string(),
                url: "https://cdn.example.com/a.png".to_string(),
            }],
            timestamp: "2016-04-30T11:18:25.796Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_posts_json_payload() {
        let (url, receiver) = spawn_receiver(StatusCode::OK, Duration::ZERO).await;
        let client = WebhookClient::new(url).unwrap();

        client.deliver(&payload()).await.unwrap();

        let requests = receiver.requests.lock().await;
        assert_eq!(requests.len(), 1);
        let (content_type, body) = &requests[0];
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let received: OutboundPayload = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(received, payload());
        assert!(body["author"]["global_name"].is_null());
    }

    #[tokio::test]
    async fn test_server_error_is_classified() {
        let (url, receiver) =
            spawn_receiver(StatusCode::INTERNAL_SERVER_ERROR, Duration::ZERO).await;
        let client = WebhookClient::new(url).unwrap();

        let err = client.deliver(&payload()).await.unwrap_err();
        match err {
            DeliveryError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected status error, got {:?}", other),
        }
        // Exactly one attempt, no retry
        assert_eq!(receiver.requests.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let (url, _receiver) = spawn_receiver(StatusCode::OK, Duration::from_secs(5)).await;
        let client = WebhookClient::with_timeout(url, Duration::from_millis(100)).unwrap();

        let err = client.deliver(&payload()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Timeout), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = WebhookClient::new(format!("http://{}/hook", addr)).unwrap();
        let err = client.deliver(&payload()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)), "got {:?}", err);

        // The OS-level cause survives into the logged text
        let report = err.report();
        assert!(report.starts_with("webhook request failed: "), "{}", report);
        assert!(report.to_lowercase().contains("refused"), "{}", report);
        assert_eq!(report.matches("webhook request failed").count(), 1);
    }

    #[test]
    fn test_report_of_status_error_has_body() {
        let err = DeliveryError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.report(), "webhook returned 502: bad gateway");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let text = "é".repeat(400);
        let cut = truncate(&text, 513);
        assert_eq!(cut.len(), 512);
        assert_eq!(truncate("short", 512), "short");
    }
}
