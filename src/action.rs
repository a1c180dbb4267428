use std::fmt;

/// Prefix of every `X-Amz-Target` value understood by the server.
pub const TARGET_PREFIX: &str = "AmazonSQS";

/// A remote SQS operation, dispatched server-side on the `X-Amz-Target`
/// header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
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
}

impl Action {
    pub const ALL: [Action; 11] = [
        Action::CreateQueue,
        Action::DeleteQueue,
        Action::GetQueueUrl,
        Action::ListQueueTags,
        Action::ListQueues,
        Action::TagQueue,
        Action::UntagQueue,
        Action::SendMessage,
        Action::PurgeQueue,
        Action::ReceiveMessage,
        Action::DeleteMessage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::CreateQueue => "CreateQueue",
            Action::DeleteQueue => "DeleteQueue",
            Action::GetQueueUrl => "GetQueueUrl",
            Action::ListQueueTags => "ListQueueTags",
            Action::ListQueues => "ListQueues",
            Action::TagQueue => "TagQueue",
            Action::UntagQueue => "UntagQueue",
            Action::SendMessage => "SendMessage",
            Action::PurgeQueue => "PurgeQueue",
            Action::ReceiveMessage => "ReceiveMessage",
            Action::DeleteMessage => "DeleteMessage",
        }
    }

    /// Value for the `X-Amz-Target` header, e.g. `AmazonSQS.CreateQueue`.
    pub fn target(self) -> String {
        format!("{}.{}", TARGET_PREFIX, self.name())
    }

    /// Inverse of [`Action::target`].
    pub fn from_target(target: &str) -> Option<Action> {
        let name = target.strip_prefix(TARGET_PREFIX)?.strip_prefix('.')?;
        Action::ALL.into_iter().find(|action| action.name() == name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
