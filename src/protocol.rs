//! JSON bodies exchanged with the server, one request/response pair per
//! [`Action`](crate::Action). Field names follow the AWS SQS JSON protocol.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateQueueRequest {
    pub queue_name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct QueueUrlResponse {
    pub queue_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueueNameRequest {
    pub queue_name: String,
}

/// Body for actions addressed only by queue URL: DeleteQueue,
/// ListQueueTags and PurgeQueue.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueueUrlRequest {
    pub queue_url: String,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ListQueuesRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ListQueuesResponse {
    pub queue_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ListQueueTagsResponse {
    pub tags: Tags,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagQueueRequest {
    pub queue_url: String,
    pub tags: Tags,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UntagQueueRequest {
    pub queue_url: String,
    pub tag_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SendMessageRequest {
    pub queue_url: String,
    pub message_body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_deduplication_id: Option<String>,
}

impl SendMessageRequest {
    pub fn new(queue_url: impl Into<String>, message_body: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            message_body: message_body.into(),
            delay_seconds: None,
            message_deduplication_id: None,
        }
    }

    pub fn delay_seconds(mut self, seconds: i64) -> Self {
        self.delay_seconds = Some(seconds);
        self
    }

    pub fn deduplication_id(mut self, id: impl Into<String>) -> Self {
        self.message_deduplication_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SendMessageResponse {
    pub message_id: String,
    #[serde(
        rename = "MD5OfMessageBody",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub md5_of_message_body: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ReceiveMessageRequest {
    pub queue_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_number_of_messages: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_timeout: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_time_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_request_attempt_id: Option<String>,
}

impl ReceiveMessageRequest {
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            max_number_of_messages: None,
            visibility_timeout: None,
            wait_time_seconds: None,
            receive_request_attempt_id: None,
        }
    }

    pub fn max_number_of_messages(mut self, max: i32) -> Self {
        self.max_number_of_messages = Some(max);
        self
    }

    pub fn visibility_timeout(mut self, seconds: i32) -> Self {
        self.visibility_timeout = Some(seconds);
        self
    }

    pub fn wait_time_seconds(mut self, seconds: i64) -> Self {
        self.wait_time_seconds = Some(seconds);
        self
    }

    pub fn attempt_id(mut self, id: impl Into<String>) -> Self {
        self.receive_request_attempt_id = Some(id.into());
        self
    }
}

/// A single delivery returned by ReceiveMessage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ReceivedMessage {
    pub message_id: String,
    /// Token needed to delete this particular delivery.
    pub receipt_handle: String,
    pub body: String,
    #[serde(rename = "MD5OfBody", default, skip_serializing_if = "Option::is_none")]
    pub md5_of_body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ReceiveMessageResponse {
    // An empty receive omits the key entirely.
    #[serde(default)]
    pub messages: Vec<ReceivedMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteMessageRequest {
    pub queue_url: String,
    pub receipt_handle: String,
}

/// Error body returned with a non-2xx status.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ErrorResponse {
    #[serde(rename = "__type", default)]
    pub kind: Option<String>,
    #[serde(rename = "Message", alias = "message", default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    /// Best-effort human readable message for a failed call. Falls back to
    /// the raw body when it is not a JSON error object.
    pub fn describe(body: &str) -> String {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(ErrorResponse {
                kind: Some(kind),
                message: Some(message),
            }) => format!("{}: {}", kind, message),
            Ok(ErrorResponse {
                message: Some(message),
                ..
            }) => message,
            Ok(ErrorResponse {
                kind: Some(kind), ..
            }) => kind,
            _ => body.trim().to_string(),
        }
    }
}
