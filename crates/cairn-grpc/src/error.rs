// ABOUTME: Error types for the cairn-grpc crate.
// ABOUTME: Splits caller preconditions from transport and server status failures.

use thiserror::Error;

use cairn_proto::{Issue, StatusCode};

/// Errors that can occur in the topic client.
///
/// Precondition variants (`StreamNotOpen`, `EmptyPath`, `EmptyWrite`,
/// `EmptyToken`) are returned synchronously to the caller and never published.
/// Transport and server failures observed after the stream is open are
/// published on the session's error event channel instead. Clone is derived so
/// errors can ride a broadcast channel.
#[derive(Error, Debug, Clone)]
pub enum TopicClientError {
    /// Invalid server address format.
    #[error("invalid server address: {0}")]
    InvalidAddress(String),

    /// Failed to connect to the server.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The session was created without a topic path.
    #[error("topic path is empty")]
    EmptyPath,

    /// A send was attempted after the channel handle was released.
    #[error("stream is not open")]
    StreamNotOpen,

    /// A write was attempted with no messages in the batch.
    #[error("write batch is empty")]
    EmptyWrite,

    /// A token update was attempted with an empty token.
    #[error("token is empty")]
    EmptyToken,

    /// The outbound stream was closed unexpectedly.
    #[error("stream closed unexpectedly")]
    StreamClosed,

    /// Transport-level failure reported by the duplex channel.
    #[error("transport error ({code:?}): {message}")]
    Transport {
        code: tonic::Code,
        message: String,
    },

    /// A decoded server frame carried a non-success status.
    #[error("server returned {code:?}: {message}")]
    BadStatus { code: StatusCode, message: String },

    /// The server violated the frame contract.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TopicClientError {
    /// Classify a non-success frame status, flattening its issues.
    pub fn from_frame_status(code: StatusCode, issues: &[Issue]) -> Self {
        Self::BadStatus {
            code,
            message: describe_issues(issues),
        }
    }

    /// Whether a caller could reasonably retry the operation on a fresh
    /// session. The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { code, .. } => {
                matches!(code, tonic::Code::Unavailable | tonic::Code::DeadlineExceeded)
            }
            Self::BadStatus { code, .. } => matches!(
                code,
                StatusCode::Overloaded | StatusCode::Unavailable | StatusCode::SessionExpired
            ),
            Self::StreamClosed => true,
            _ => false,
        }
    }
}

impl From<tonic::Status> for TopicClientError {
    fn from(status: tonic::Status) -> Self {
        TopicClientError::Transport {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

impl From<tonic::transport::Error> for TopicClientError {
    fn from(err: tonic::transport::Error) -> Self {
        TopicClientError::ConnectionFailed(err.to_string())
    }
}

fn describe_issues(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return "no issues reported".to_string();
    }
    issues
        .iter()
        .map(|issue| format!("[{}] {}", issue.code, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}
