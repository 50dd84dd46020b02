//! Queued message model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery state of a queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Pending,
    Sending,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Failed => "failed",
        }
    }
}

/// Input for enqueuing a message.
#[derive(Debug, Clone, Default)]
pub struct NewQueuedMessage {
    pub match_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    /// Message body, or the caption when `image_url` is set (may be empty).
    pub text: String,
    /// Pre-uploaded image reference; makes this an image message.
    pub image_url: Option<String>,
}

impl NewQueuedMessage {
    pub fn text(
        match_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            text: text.into(),
            image_url: None,
        }
    }

    pub fn image(
        match_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        image_url: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            text: caption.into(),
            image_url: Some(image_url.into()),
        }
    }
}

/// An outbound message that has not been confirmed delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMessage {
    pub id: String,
    pub match_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Enqueue time, not send time.
    pub timestamp: DateTime<Utc>,
    pub retry_count: u32,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueuedMessage {
    pub fn new(new: NewQueuedMessage, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            match_id: new.match_id,
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            text: new.text,
            image_url: new.image_url,
            timestamp,
            retry_count: 0,
            status: MessageStatus::Pending,
            last_error: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.image_url.is_some()
    }

    /// Caption for an image message; empty text means no caption.
    pub fn caption(&self) -> Option<&str> {
        if self.text.is_empty() {
            None
        } else {
            Some(self.text.as_str())
        }
    }

    /// Failed often enough that only an explicit retry will send it again.
    pub fn is_stuck(&self, max_send_attempts: u32) -> bool {
        self.status == MessageStatus::Failed && self.retry_count >= max_send_attempts
    }

    pub(crate) fn record_failure(&mut self, error: String) {
        self.status = MessageStatus::Failed;
        self.retry_count += 1;
        self.last_error = Some(error);
    }

    pub(crate) fn reset_for_retry(&mut self) {
        self.status = MessageStatus::Pending;
        self.retry_count = 0;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_starts_pending() {
        let now = Utc::now();
        let message = QueuedMessage::new(NewQueuedMessage::text("m1", "u1", "u2", "hi"), now);

        assert!(!message.id.is_empty());
        assert_eq!(message.status, MessageStatus::Pending);
        assert_eq!(message.retry_count, 0);
        assert_eq!(message.timestamp, now);
        assert!(message.last_error.is_none());
        assert!(!message.is_image());
    }

    #[test]
    fn ids_are_unique() {
        let now = Utc::now();
        let a = QueuedMessage::new(NewQueuedMessage::text("m1", "u1", "u2", "a"), now);
        let b = QueuedMessage::new(NewQueuedMessage::text("m1", "u1", "u2", "a"), now);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn image_caption_is_optional() {
        let now = Utc::now();
        let bare = QueuedMessage::new(
            NewQueuedMessage::image("m1", "u1", "u2", "https://cdn/x.jpg", ""),
            now,
        );
        assert!(bare.is_image());
        assert_eq!(bare.caption(), None);

        let captioned = QueuedMessage::new(
            NewQueuedMessage::image("m1", "u1", "u2", "https://cdn/x.jpg", "gg"),
            now,
        );
        assert_eq!(captioned.caption(), Some("gg"));
    }

    #[test]
    fn stuck_only_when_failed_at_cap() {
        let mut message =
            QueuedMessage::new(NewQueuedMessage::text("m1", "u1", "u2", "hi"), Utc::now());

        for _ in 0..2 {
            message.record_failure("timeout".to_string());
        }
        assert!(!message.is_stuck(3));

        message.record_failure("timeout".to_string());
        assert_eq!(message.retry_count, 3);
        assert_eq!(message.last_error.as_deref(), Some("timeout"));
        assert!(message.is_stuck(3));

        // A pending message is never stuck, whatever its count
        message.status = MessageStatus::Pending;
        assert!(!message.is_stuck(3));
    }

    #[test]
    fn reset_for_retry_clears_count() {
        let mut message =
            QueuedMessage::new(NewQueuedMessage::text("m1", "u1", "u2", "hi"), Utc::now());
        message.record_failure("boom".to_string());

        message.reset_for_retry();
        assert_eq!(message.status, MessageStatus::Pending);
        assert_eq!(message.retry_count, 0);
        assert!(message.last_error.is_none());
    }

    #[test]
    fn serializes_with_camel_case_and_lowercase_status() {
        let mut message =
            QueuedMessage::new(NewQueuedMessage::text("m1", "u1", "u2", "hi"), Utc::now());
        message.record_failure("offline".to_string());

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["matchId"], "m1");
        assert_eq!(json["retryCount"], 1);
        assert_eq!(json["status"], "failed");
        assert_eq!(json["lastError"], "offline");
        assert!(json.get("imageUrl").is_none());
    }

    #[test]
    fn status_strings() {
        assert_eq!(MessageStatus::Pending.as_str(), "pending");
        assert_eq!(MessageStatus::Sending.as_str(), "sending");
        assert_eq!(MessageStatus::Failed.as_str(), "failed");
    }
}
