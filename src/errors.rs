use crate::config::ClientConfigError;

/// Errors raised while setting up the request machinery itself.
///
/// Nothing here is ever delivered on a request stream. Once a request is
/// subscribed, failures travel as [`FailureReason`] instead.
#[derive(Debug, thiserror::Error)]
pub enum XhrError {
    #[error("No tokio runtime available to drive requests")]
    NoRuntime,

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(#[from] ClientConfigError),

    #[error("Cannot build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Reason a request stream terminated with an error.
///
/// The message is a pure function of the variant. No transport details or
/// backtraces are attached.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum FailureReason {
    /// The transport reported a failure (connect, DNS, TLS, invalid request...)
    #[error("A network error occurred")]
    NetworkError,
    /// The transport gave up waiting for the response
    #[error("The request timed out")]
    TimeoutError,
}

impl FailureReason {
    /// Human-readable message for this failure.
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::NetworkError => "A network error occurred",
            FailureReason::TimeoutError => "The request timed out",
        }
    }
}

/// The response body could not be parsed as JSON.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Error parsing JSON response: {message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    pub(crate) fn new(err: &serde_json::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}
