use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqsError {
    #[error("{0} is required")]
    MissingArgument(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl SqsError {
    /// True for errors raised while checking arguments, before any request
    /// was sent.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SqsError::MissingArgument(_) | SqsError::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SqsError>;
