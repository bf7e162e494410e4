use serde::{Deserialize, Serialize};

/// Terminal failure of a streamed send.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamFailure {
    /// The server reported an `error` chunk.
    #[error("server error: {error_text}")]
    Server { error_text: String },
    /// Network or stream I/O failed.
    #[error("transport failure: {message}")]
    Transport { message: String },
    /// A frame could not be decoded or the stream ended out of sequence.
    #[error("protocol failure: {message}")]
    Protocol { message: String },
    /// The send was aborted by the caller.
    #[error("stream cancelled")]
    Cancelled,
    /// No chunk arrived within the idle timeout.
    #[error("stream idle for {seconds}s")]
    Timeout { seconds: u64 },
}

impl StreamFailure {
    pub fn server(error_text: impl Into<String>) -> Self {
        Self::Server {
            error_text: error_text.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

/// Top-level error type of the chat client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Invalid client configuration or local settings.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input.
    #[error("validation error: {0}")]
    Validation(String),
    /// The session cannot send yet (still configuring, or failed).
    #[error("not ready: {0}")]
    NotReady(String),
    /// The backend does not know the chat.
    #[error("chat not found: {0}")]
    NotFound(String),
    /// The backend answered with a non-success status.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Request could not be sent or its body not read.
    #[error("transport error: {0}")]
    Transport(String),
    /// Response shape was not what the client expects.
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("cancelled")]
    Cancelled,
    /// A started send ended with a terminal failure.
    #[error(transparent)]
    StreamFailed(StreamFailure),
}

impl From<StreamFailure> for ChatError {
    fn from(value: StreamFailure) -> Self {
        match value {
            StreamFailure::Cancelled => ChatError::Cancelled,
            other => ChatError::StreamFailed(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// User-facing message raised by the session (the toast of a graphical client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        write!(f, "[{level}] {}", self.message)
    }
}
