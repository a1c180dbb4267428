//! Command-line surface: argument parsing, per-command validation and the
//! two scripted commands (`smoke-test` and `test-seed`).

use crate::{
    client::SqsClient,
    config::{Config, ConfigBuilder},
    error::{Result, SqsError},
    protocol::{ReceiveMessageRequest, SendMessageRequest, Tags},
};
use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Body sent by `send-message` when `--message-body` is not given.
pub const DEFAULT_MESSAGE_BODY: &str = r#"{"key":"value"}"#;
/// Body of the message `test-seed` puts on every seeded queue.
pub const SEED_MESSAGE_BODY: &str = r#"{"message":"body"}"#;
/// Number of throwaway queues created by `smoke-test`.
pub const SMOKE_TEST_QUEUES: usize = 4;
/// Number of `test-queue-N` queues created by `test-seed`.
pub const SEED_QUEUES: usize = 5;

const TAG_KEY: &str = "key";
const TAG_VALUE: &str = "value";

#[derive(Parser, Debug, Clone)]
#[command(name = "sqscpp-cli", version, about = "sqscpp test CLI", long_about = None)]
pub struct Cli {
    /// Command to run
    #[arg(value_enum)]
    pub command: Command,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// sqscpp protocol
    #[arg(long, default_value = "http")]
    pub protocol: String,

    /// sqscpp host
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// sqscpp port
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Queue name
    #[arg(long)]
    pub queue_name: Option<String>,

    /// Queue URL
    #[arg(long)]
    pub queue_url: Option<String>,

    /// Tag key
    #[arg(long)]
    pub tag: Option<String>,

    /// Receipt handle
    #[arg(long)]
    pub receipt_handle: Option<String>,

    /// Message body for send-message
    #[arg(long, default_value = DEFAULT_MESSAGE_BODY)]
    pub message_body: String,

    /// Delivery delay for send-message, in seconds
    #[arg(long)]
    pub delay_seconds: Option<i64>,

    /// Number of messages send-message puts on the queue, one request each
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,

    /// Upper bound on messages returned by receive-message
    #[arg(long)]
    pub max_messages: Option<i32>,

    /// Visibility timeout for receive-message, in seconds
    #[arg(long)]
    pub visibility_timeout: Option<i32>,

    /// Long-poll wait for receive-message, in seconds
    #[arg(long)]
    pub wait_time_seconds: Option<i64>,
}

impl Cli {
    pub fn config(&self) -> Config {
        ConfigBuilder::new()
            .protocol(self.protocol.as_str())
            .host(self.host.as_str())
            .port(self.port)
            .build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Command {
    SmokeTest,
    CreateQueue,
    DeleteQueue,
    GetQueueUrl,
    ListQueueTags,
    ListQueues,
    TagQueue,
    UntagQueue,
    SendMessage,
    PurgeQueue,
    ReceiveMessage,
    DeleteMessage,
    TestSeed,
}

/// A command whose required arguments have been checked. Building one never
/// touches the network, so a missing argument is always reported before any
/// request is sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    SmokeTest,
    TestSeed,
    CreateQueue { queue_name: String },
    DeleteQueue { queue_url: String },
    GetQueueUrl { queue_name: String },
    ListQueueTags { queue_url: String },
    ListQueues,
    TagQueue { queue_url: String, tag: String },
    UntagQueue { queue_url: String, tag: String },
    SendMessage {
        request: SendMessageRequest,
        count: u32,
    },
    PurgeQueue { queue_url: String },
    ReceiveMessage(ReceiveMessageRequest),
    DeleteMessage { queue_url: String, receipt_handle: String },
}

fn required(value: &Option<String>, what: &'static str) -> Result<String> {
    value
        .as_deref()
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(SqsError::MissingArgument(what))
}

impl Invocation {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let queue_name = || required(&cli.queue_name, "Queue name");
        let queue_url = || required(&cli.queue_url, "Queue URL");

        let invocation = match cli.command {
            Command::SmokeTest => Invocation::SmokeTest,
            Command::TestSeed => Invocation::TestSeed,
            Command::CreateQueue => Invocation::CreateQueue {
                queue_name: queue_name()?,
            },
            Command::DeleteQueue => Invocation::DeleteQueue {
                queue_url: queue_url()?,
            },
            Command::GetQueueUrl => Invocation::GetQueueUrl {
                queue_name: queue_name()?,
            },
            Command::ListQueueTags => Invocation::ListQueueTags {
                queue_url: queue_url()?,
            },
            Command::ListQueues => Invocation::ListQueues,
            Command::TagQueue => Invocation::TagQueue {
                queue_url: queue_url()?,
                tag: required(&cli.tag, "Tag")?,
            },
            Command::UntagQueue => Invocation::UntagQueue {
                queue_url: queue_url()?,
                tag: required(&cli.tag, "Tag")?,
            },
            Command::SendMessage => {
                let mut request = SendMessageRequest::new(queue_url()?, cli.message_body.as_str());
                request.delay_seconds = cli.delay_seconds;
                Invocation::SendMessage {
                    request,
                    count: cli.count,
                }
            }
            Command::PurgeQueue => Invocation::PurgeQueue {
                queue_url: queue_url()?,
            },
            Command::ReceiveMessage => {
                let mut request = ReceiveMessageRequest::new(queue_url()?);
                request.max_number_of_messages = cli.max_messages;
                request.visibility_timeout = cli.visibility_timeout;
                request.wait_time_seconds = cli.wait_time_seconds;
                Invocation::ReceiveMessage(request)
            }
            Command::DeleteMessage => Invocation::DeleteMessage {
                queue_url: queue_url()?,
                receipt_handle: required(&cli.receipt_handle, "Receipt handle")?,
            },
        };

        Ok(invocation)
    }

    /// Runs the command and returns what should be printed on stdout, if
    /// anything.
    pub async fn execute(self, client: &SqsClient) -> Result<Option<String>> {
        match self {
            Invocation::SmokeTest => {
                let queues = smoke_test(client).await?;
                Ok(Some(format!(
                    "smoke test passed ({} queues created and deleted)",
                    queues.len()
                )))
            }
            Invocation::TestSeed => {
                let urls = test_seed(client).await?;
                Ok(Some(urls.join("\n")))
            }
            Invocation::CreateQueue { queue_name } => {
                let url = client.create_queue(queue_name, source_attributes()).await?;
                Ok(Some(url))
            }
            Invocation::DeleteQueue { queue_url } => {
                client.delete_queue(queue_url.as_str()).await?;
                info!(queue_url = %queue_url, "deleted queue");
                Ok(None)
            }
            Invocation::GetQueueUrl { queue_name } => {
                Ok(Some(client.get_queue_url(queue_name).await?))
            }
            Invocation::ListQueueTags { queue_url } => {
                let tags = client.list_queue_tags(queue_url).await?;
                Ok(Some(serde_json::to_string(&tags)?))
            }
            Invocation::ListQueues => {
                let urls = client.list_queues().await?;
                Ok((!urls.is_empty()).then(|| urls.join("\n")))
            }
            Invocation::TagQueue { queue_url, tag } => {
                let tags = Tags::from([(tag, TAG_VALUE.to_string())]);
                client.tag_queue(queue_url.as_str(), tags).await?;
                info!(queue_url = %queue_url, "tagged queue");
                Ok(None)
            }
            Invocation::UntagQueue { queue_url, tag } => {
                client.untag_queue(queue_url.as_str(), &[tag.as_str()]).await?;
                info!(queue_url = %queue_url, tag = %tag, "untagged queue");
                Ok(None)
            }
            Invocation::SendMessage { request, count } => {
                let mut sent = Vec::with_capacity(count as usize);
                for ix in 1..=count {
                    let response = client.send_message(&request).await?;
                    debug!(message_id = %response.message_id, "sent message {}/{}", ix, count);
                    sent.push(serde_json::to_string(&response)?);
                }
                Ok(Some(sent.join("\n")))
            }
            Invocation::PurgeQueue { queue_url } => {
                client.purge_queue(queue_url.as_str()).await?;
                info!(queue_url = %queue_url, "purged queue");
                Ok(None)
            }
            Invocation::ReceiveMessage(request) => {
                let response = client.receive_message(&request).await?;
                Ok(Some(serde_json::to_string(&response)?))
            }
            Invocation::DeleteMessage {
                queue_url,
                receipt_handle,
            } => {
                client.delete_message(queue_url.as_str(), receipt_handle).await?;
                info!(queue_url = %queue_url, "deleted message");
                Ok(None)
            }
        }
    }
}

/// Attributes attached to every queue this tool creates.
fn source_attributes() -> BTreeMap<String, String> {
    BTreeMap::from([("source".to_string(), env!("CARGO_PKG_NAME").to_string())])
}

fn ensure(condition: bool, describe: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(SqsError::UnexpectedResponse(describe()))
    }
}

/// Exercises every action against the server using freshly named queues and
/// removes them again. Returns the names of the queues it used.
///
/// Steps run strictly in order and the first failure aborts the run; queues
/// created before the failure are left behind.
pub async fn smoke_test(client: &SqsClient) -> Result<Vec<String>> {
    let names: Vec<String> = (0..SMOKE_TEST_QUEUES)
        .map(|_| format!("test-{}", Uuid::new_v4()))
        .collect();

    let mut urls = Vec::with_capacity(names.len());
    for name in &names {
        info!(queue = %name, "creating queue");
        client.create_queue(name.as_str(), source_attributes()).await?;

        let url = client.get_queue_url(name.as_str()).await?;
        ensure(url.contains(name.as_str()), || {
            format!("queue URL {} does not contain queue name {}", url, name)
        })?;
        urls.push(url);
    }

    let listed = client.list_queues().await?;
    info!(queues = ?listed, "listed queues");
    for url in &urls {
        ensure(listed.contains(url), || format!("{} missing from ListQueues", url))?;
    }

    let first = &urls[0];
    client
        .tag_queue(first, Tags::from([(TAG_KEY.to_string(), TAG_VALUE.to_string())]))
        .await?;
    let tags = client.list_queue_tags(first).await?;
    info!(?tags, "tags after TagQueue");
    ensure(tags.get(TAG_KEY).map(String::as_str) == Some(TAG_VALUE), || {
        format!("tag {}={} missing after TagQueue", TAG_KEY, TAG_VALUE)
    })?;

    client.untag_queue(first, &[TAG_KEY]).await?;
    let tags = client.list_queue_tags(first).await?;
    info!(?tags, "tags after UntagQueue");
    ensure(!tags.contains_key(TAG_KEY), || {
        format!("tag {} still present after UntagQueue", TAG_KEY)
    })?;

    for (name, url) in names.iter().zip(&urls) {
        info!(queue = %name, "sending message");
        client
            .send_message(&SendMessageRequest::new(url, DEFAULT_MESSAGE_BODY))
            .await?;
    }

    for (name, url) in names.iter().zip(&urls) {
        info!(queue = %name, "purging queue");
        client.purge_queue(url).await?;
    }

    for (name, url) in names.iter().zip(&urls) {
        info!(queue = %name, "sending message");
        client
            .send_message(&SendMessageRequest::new(url, DEFAULT_MESSAGE_BODY))
            .await?;

        info!(queue = %name, "receiving message");
        let received = client
            .receive_message(&ReceiveMessageRequest::new(url))
            .await?;
        let message = received.messages.into_iter().next().ok_or_else(|| {
            SqsError::UnexpectedResponse(format!("no message received from {}", name))
        })?;
        ensure(message.body == DEFAULT_MESSAGE_BODY, || {
            format!("received body {:?} from {}", message.body, name)
        })?;
        ensure(!message.receipt_handle.is_empty(), || {
            format!("empty receipt handle from {}", name)
        })?;

        info!(queue = %name, "deleting message");
        client.delete_message(url, message.receipt_handle).await?;
    }

    for (name, url) in names.iter().zip(&urls) {
        info!(queue = %name, "deleting queue");
        client.delete_queue(url).await?;
    }

    let remaining = client.list_queues().await?;
    info!(queues = ?remaining, "listed queues");
    for url in &urls {
        ensure(!remaining.contains(url), || {
            format!("{} still listed after DeleteQueue", url)
        })?;
    }

    Ok(names)
}

/// Creates `test-queue-0` .. `test-queue-4`, tags each one and leaves a
/// single message on it. Returns the queue URLs.
pub async fn test_seed(client: &SqsClient) -> Result<Vec<String>> {
    let mut urls = Vec::with_capacity(SEED_QUEUES);

    for ix in 0..SEED_QUEUES {
        let name = format!("test-queue-{}", ix);
        info!(queue = %name, "seeding queue");

        client.create_queue(name.as_str(), source_attributes()).await?;
        let url = client.get_queue_url(name.as_str()).await?;
        client
            .tag_queue(url.as_str(), Tags::from([(TAG_KEY.to_string(), TAG_VALUE.to_string())]))
            .await?;
        client
            .send_message(&SendMessageRequest::new(url.as_str(), SEED_MESSAGE_BODY))
            .await?;

        urls.push(url);
    }

    Ok(urls)
}
