//! Remote message delivery.

use crate::{OutboxError, OutboxResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Port to the remote message-send API.
///
/// One call is one attempt; retry policy belongs to the queue.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text_message(
        &self,
        match_id: &str,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
    ) -> OutboxResult<()>;

    async fn send_image_message(
        &self,
        match_id: &str,
        sender_id: &str,
        receiver_id: &str,
        image_url: &str,
        caption: Option<&str>,
    ) -> OutboxResult<()>;
}

/// Sender configuration.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Base URL for the message API.
    pub api_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.squadlink.app".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest<'a> {
    sender_id: &'a str,
    receiver_id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageResponse {
    success: bool,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Posts messages as JSON to `{api_url}/matches/{match_id}/messages`.
pub struct HttpMessageSender {
    config: SenderConfig,
    client: Client,
    auth_token: RwLock<Option<String>>,
}

impl HttpMessageSender {
    pub fn new(config: SenderConfig, auth_token: Option<String>) -> OutboxResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            config,
            client,
            auth_token: RwLock::new(auth_token),
        })
    }

    /// Replace the bearer token (e.g. after a refresh).
    pub fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write() = token;
    }

    fn messages_url(&self, match_id: &str) -> OutboxResult<Url> {
        let mut url = Url::parse(&self.config.api_url)
            .map_err(|e| OutboxError::InvalidUrl(format!("{}: {}", self.config.api_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| OutboxError::InvalidUrl(self.config.api_url.clone()))?
            .pop_if_empty()
            .extend(["matches", match_id, "messages"]);
        Ok(url)
    }

    async fn post(&self, match_id: &str, request: &SendMessageRequest<'_>) -> OutboxResult<()> {
        let url = self.messages_url(match_id)?;
        debug!(url = %url, kind = request.kind, "Sending message");

        let token = self.auth_token.read().clone();
        let mut builder = self.client.post(url).json(request);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OutboxError::Send(format!("HTTP {}: {}", status, body)));
        }

        let result: SendMessageResponse = response.json().await?;
        if result.success {
            debug!(match_id = %match_id, remote_id = ?result.message_id, "Message accepted");
            Ok(())
        } else {
            Err(OutboxError::Send(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}

#[async_trait]
impl MessageSender for HttpMessageSender {
    async fn send_text_message(
        &self,
        match_id: &str,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
    ) -> OutboxResult<()> {
        let request = SendMessageRequest {
            sender_id,
            receiver_id,
            kind: "text",
            text: Some(text),
            image_url: None,
        };
        self.post(match_id, &request).await
    }

    async fn send_image_message(
        &self,
        match_id: &str,
        sender_id: &str,
        receiver_id: &str,
        image_url: &str,
        caption: Option<&str>,
    ) -> OutboxResult<()> {
        let request = SendMessageRequest {
            sender_id,
            receiver_id,
            kind: "image",
            text: caption,
            image_url: Some(image_url),
        };
        self.post(match_id, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sender_for(server: &MockServer, token: Option<&str>) -> HttpMessageSender {
        HttpMessageSender::new(
            SenderConfig {
                api_url: server.uri(),
                timeout: Duration::from_secs(5),
            },
            token.map(str::to_string),
        )
        .unwrap()
    }

    #[test]
    fn test_sender_config_default() {
        let config = SenderConfig::default();
        assert_eq!(config.api_url, "https://api.squadlink.app");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_messages_url_escapes_match_id() {
        let sender = HttpMessageSender::new(
            SenderConfig {
                api_url: "https://api.example.com/v1/".to_string(),
                ..Default::default()
            },
            None,
        )
        .unwrap();

        let url = sender.messages_url("match 1/x").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/matches/match%201%2Fx/messages"
        );
    }

    #[test]
    fn test_messages_url_rejects_invalid_base() {
        let sender = HttpMessageSender::new(
            SenderConfig {
                api_url: "not a url".to_string(),
                ..Default::default()
            },
            None,
        )
        .unwrap();

        assert!(matches!(
            sender.messages_url("m1"),
            Err(OutboxError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_send_text_message_posts_json_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/matches/m1/messages"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({
                "senderId": "u1",
                "receiverId": "u2",
                "type": "text",
                "text": "gg wp"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "messageId": "remote-1" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sender = sender_for(&server, Some("tok"));
        sender
            .send_text_message("m1", "u1", "u2", "gg wp")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_image_message_without_caption() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/matches/m1/messages"))
            .and(body_json(json!({
                "senderId": "u1",
                "receiverId": "u2",
                "type": "image",
                "imageUrl": "https://cdn.example.com/a.jpg"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let sender = sender_for(&server, None);
        sender
            .send_image_message("m1", "u1", "u2", "https://cdn.example.com/a.jpg", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_http_error_status_is_send_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let sender = sender_for(&server, None);
        let err = sender
            .send_text_message("m1", "u1", "u2", "hi")
            .await
            .unwrap_err();

        match err {
            OutboxError::Send(msg) => {
                assert!(msg.contains("503"));
                assert!(msg.contains("maintenance"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_message_carries_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": false, "error": "match closed" })),
            )
            .mount(&server)
            .await;

        let sender = sender_for(&server, None);
        let err = sender
            .send_text_message("m1", "u1", "u2", "hi")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Send failed: match closed");
    }

    #[tokio::test]
    async fn test_set_auth_token_applies_to_next_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let sender = sender_for(&server, Some("stale"));
        sender.set_auth_token(Some("fresh".to_string()));
        sender
            .send_text_message("m1", "u1", "u2", "hi")
            .await
            .unwrap();
    }
}
