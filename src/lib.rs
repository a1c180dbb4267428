//! # sqscpp-cli
//!
//! Test client for sqscpp, an SQS-compatible message
//! queue server speaking the AWS SQS JSON protocol.
//!
//! The crate ships a small async client library and the `sqscpp-cli` binary
//! built on it. Every operation is one `POST` to the server root with an
//! `X-Amz-Target: AmazonSQS.<Action>` header and an
//! `application/x-amz-json-1.0` body. There are no retries: the first
//! transport error or non-2xx status is returned to the caller.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sqscpp_cli::{SendMessageRequest, ReceiveMessageRequest, SqsClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SqsClient::new("localhost", 8080)?;
//!
//!     let queue_url = client.create_queue("orders", Default::default()).await?;
//!     client
//!         .send_message(&SendMessageRequest::new(&queue_url, "Hello, sqscpp!"))
//!         .await?;
//!
//!     let received = client
//!         .receive_message(&ReceiveMessageRequest::new(&queue_url))
//!         .await?;
//!     for message in received.messages {
//!         println!("{}", message.body);
//!         client.delete_message(&queue_url, message.receipt_handle).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Command line
//!
//! ```text
//! sqscpp-cli list-queues --host localhost --port 8080
//! sqscpp-cli create-queue --queue-name orders
//! sqscpp-cli smoke-test --debug
//! ```
//!
//! See [`commands::Cli`] for the full flag set.

pub mod action;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod protocol;

pub use action::Action;
pub use client::SqsClient;
pub use commands::{Cli, Command, Invocation};
pub use config::{Config, ConfigBuilder};
pub use error::{Result, SqsError};
pub use protocol::{
    ReceiveMessageRequest, ReceiveMessageResponse, ReceivedMessage, SendMessageRequest,
    SendMessageResponse, Tags,
};
