use crate::{
    action::Action,
    config::{Config, ConfigBuilder},
    error::{Result, SqsError},
    protocol::*,
};
use reqwest::header::CONTENT_TYPE;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Content type of every request body in the SQS JSON protocol.
pub const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.0";
/// Header carrying the action name, e.g. `AmazonSQS.SendMessage`.
pub const TARGET_HEADER: &str = "X-Amz-Target";
/// Header carrying a per-request unique identifier.
pub const TRACE_ID_HEADER: &str = "X-Amzn-Trace-Id";

/// Client for an sqscpp (SQS-compatible) server.
///
/// Every operation is a single `POST` to the server root. The action is
/// selected by the `X-Amz-Target` header and the arguments travel as an
/// `application/x-amz-json-1.0` body. Calls are never retried: a transport
/// failure or a non-2xx status is returned to the caller as-is.
///
/// # Examples
///
/// ```no_run
/// use sqscpp_cli::SqsClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), sqscpp_cli::SqsError> {
///     let client = SqsClient::new("localhost", 8080)?;
///
///     let queue_url = client.create_queue("orders", Default::default()).await?;
///     for url in client.list_queues().await? {
///         println!("{}", url);
///     }
///     client.delete_queue(&queue_url).await?;
///     Ok(())
/// }
/// ```
pub struct SqsClient {
    config: Config,
    base_url: String,
    http: reqwest::Client,
}

impl SqsClient {
    /// Creates a client for `http://{host}:{port}/` with default settings.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let config = ConfigBuilder::new().host(host).port(port).build();

        Self::with_config(config)
    }

    /// Creates a client from an explicit [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`SqsError::InvalidConfig`] when the protocol is neither `http`
    /// nor `https` or the host is empty, and [`SqsError::Http`] if the
    /// underlying HTTP client cannot be constructed.
    pub fn with_config(config: Config) -> Result<Self> {
        if !matches!(config.protocol.as_str(), "http" | "https") {
            return Err(SqsError::InvalidConfig(format!(
                "unsupported protocol '{}'",
                config.protocol
            )));
        }
        if config.host.trim().is_empty() {
            return Err(SqsError::InvalidConfig("host must not be empty".to_string()));
        }

        let mut http = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            http = http.timeout(timeout);
        }
        let http = http.build()?;
        let base_url = format!("{}/", config.base_url());

        Ok(Self {
            config,
            base_url,
            http,
        })
    }

    /// Returns a [`ConfigBuilder`] for use with [`SqsClient::with_config`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sqscpp_cli::SqsClient;
    /// use std::time::Duration;
    ///
    /// let config = SqsClient::builder()
    ///     .protocol("https")
    ///     .host("sqs.internal")
    ///     .port(9324)
    ///     .timeout(Duration::from_secs(5))
    ///     .build();
    /// let client = SqsClient::with_config(config)?;
    /// assert_eq!(client.base_url(), "https://sqs.internal:9324/");
    /// # Ok::<(), sqscpp_cli::SqsError>(())
    /// ```
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The URL every request is posted to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one action to the server and returns the raw HTTP response.
    ///
    /// The status is not inspected; the typed methods below are built on top
    /// of this and turn non-2xx responses into [`SqsError::Server`].
    pub async fn call<T>(&self, action: Action, body: &T) -> Result<reqwest::Response>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_vec(body)?;
        let trace_id = Uuid::new_v4();

        debug!(%action, %trace_id, url = %self.base_url, "sending request");

        let response = self
            .http
            .post(&self.base_url)
            .header(CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .header(TARGET_HEADER, action.target())
            .header(TRACE_ID_HEADER, trace_id.to_string())
            .body(payload)
            .send()
            .await?;

        debug!(%action, %trace_id, status = response.status().as_u16(), "received response");
        Ok(response)
    }

    async fn request<T, R>(&self, action: Action, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let text = self.checked_call(action, body).await?;
        serde_json::from_str(&text).map_err(Into::into)
    }

    async fn checked_call<T>(&self, action: Action, body: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        let response = self.call(action, body).await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Self::check_status(status, text)
    }

    fn check_status(status: u16, body: String) -> Result<String> {
        if (200..300).contains(&status) {
            Ok(body)
        } else {
            Err(SqsError::Server {
                status,
                message: ErrorResponse::describe(&body),
            })
        }
    }

    /// Creates a queue and returns its URL.
    pub async fn create_queue(
        &self,
        queue_name: impl Into<String>,
        attributes: BTreeMap<String, String>,
    ) -> Result<String> {
        let request = CreateQueueRequest {
            queue_name: queue_name.into(),
            attributes,
        };
        let response: QueueUrlResponse = self.request(Action::CreateQueue, &request).await?;
        Ok(response.queue_url)
    }

    /// Deletes the queue at `queue_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SqsError::Server`] if the server rejects the call, for
    /// example because the queue does not exist.
    pub async fn delete_queue(&self, queue_url: impl Into<String>) -> Result<()> {
        let request = QueueUrlRequest {
            queue_url: queue_url.into(),
        };
        self.checked_call(Action::DeleteQueue, &request).await?;
        Ok(())
    }

    /// Resolves a queue name to the URL used to address it.
    pub async fn get_queue_url(&self, queue_name: impl Into<String>) -> Result<String> {
        let request = QueueNameRequest {
            queue_name: queue_name.into(),
        };
        let response: QueueUrlResponse = self.request(Action::GetQueueUrl, &request).await?;
        Ok(response.queue_url)
    }

    /// Returns every tag currently set on the queue.
    ///
    /// # Errors
    ///
    /// Returns [`SqsError::Server`] on a non-2xx status and
    /// [`SqsError::Serialization`] if the body has no `Tags` map.
    pub async fn list_queue_tags(&self, queue_url: impl Into<String>) -> Result<Tags> {
        let request = QueueUrlRequest {
            queue_url: queue_url.into(),
        };
        let response: ListQueueTagsResponse =
            self.request(Action::ListQueueTags, &request).await?;
        Ok(response.tags)
    }

    /// Lists the URLs of all queues on the server.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use sqscpp_cli::SqsClient;
    /// # async fn example(client: &SqsClient) -> sqscpp_cli::Result<()> {
    /// for url in client.list_queues().await? {
    ///     println!("{}", url);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`SqsError::Server`] on a non-2xx status and
    /// [`SqsError::Serialization`] if the body has no `QueueUrls` list.
    pub async fn list_queues(&self) -> Result<Vec<String>> {
        let response: ListQueuesResponse = self
            .request(Action::ListQueues, &ListQueuesRequest::default())
            .await?;
        Ok(response.queue_urls)
    }

    /// Adds `tags` to the queue, overwriting existing values for the same
    /// keys.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use sqscpp_cli::{SqsClient, Tags};
    /// # async fn example(client: &SqsClient, queue_url: &str) -> sqscpp_cli::Result<()> {
    /// let tags = Tags::from([("env".to_string(), "staging".to_string())]);
    /// client.tag_queue(queue_url, tags).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn tag_queue(&self, queue_url: impl Into<String>, tags: Tags) -> Result<()> {
        let request = TagQueueRequest {
            queue_url: queue_url.into(),
            tags,
        };
        self.checked_call(Action::TagQueue, &request).await?;
        Ok(())
    }

    /// Removes the tags named in `tag_keys` from the queue. Keys that are not
    /// set are left to the server to ignore or reject.
    pub async fn untag_queue(&self, queue_url: impl Into<String>, tag_keys: &[&str]) -> Result<()> {
        let request = UntagQueueRequest {
            queue_url: queue_url.into(),
            tag_keys: tag_keys.iter().map(|key| key.to_string()).collect(),
        };
        self.checked_call(Action::UntagQueue, &request).await?;
        Ok(())
    }

    /// Sends a message.
    ///
    /// ```no_run
    /// # use sqscpp_cli::{SqsClient, SendMessageRequest};
    /// # async fn example(client: &SqsClient, queue_url: &str) -> sqscpp_cli::Result<()> {
    /// let sent = client
    ///     .send_message(&SendMessageRequest::new(queue_url, "hello").delay_seconds(5))
    ///     .await?;
    /// println!("sent {}", sent.message_id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send_message(&self, request: &SendMessageRequest) -> Result<SendMessageResponse> {
        self.request(Action::SendMessage, request).await
    }

    /// Drops every message currently in the queue. The queue itself stays.
    ///
    /// # Errors
    ///
    /// Returns [`SqsError::Server`] if the server rejects the call.
    pub async fn purge_queue(&self, queue_url: impl Into<String>) -> Result<()> {
        let request = QueueUrlRequest {
            queue_url: queue_url.into(),
        };
        self.checked_call(Action::PurgeQueue, &request).await?;
        Ok(())
    }

    /// Receives messages. An empty queue yields an empty `messages` list,
    /// not an error.
    pub async fn receive_message(
        &self,
        request: &ReceiveMessageRequest,
    ) -> Result<ReceiveMessageResponse> {
        self.request(Action::ReceiveMessage, request).await
    }

    /// Deletes the delivery identified by `receipt_handle`.
    pub async fn delete_message(
        &self,
        queue_url: impl Into<String>,
        receipt_handle: impl Into<String>,
    ) -> Result<()> {
        let request = DeleteMessageRequest {
            queue_url: queue_url.into(),
            receipt_handle: receipt_handle.into(),
        };
        self.checked_call(Action::DeleteMessage, &request).await?;
        Ok(())
    }
}
