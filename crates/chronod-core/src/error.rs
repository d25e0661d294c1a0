use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChronodError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot open channel {name}: {reason}")]
    ChannelOpen { name: String, reason: String },

    #[error("Send on channel {name} failed: {reason}")]
    ChannelSend { name: String, reason: String },

    #[error("Receive on channel {name} failed: {reason}")]
    ChannelReceive { name: String, reason: String },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChronodError {
    /// Short error code string for operator-facing messages and logs.
    pub fn code(&self) -> &'static str {
        match self {
            ChronodError::Config(_) => "CONFIG_ERROR",
            ChronodError::ChannelOpen { .. } => "CHANNEL_OPEN_FAILURE",
            ChronodError::ChannelSend { .. } => "CHANNEL_SEND_FAILURE",
            ChronodError::ChannelReceive { .. } => "CHANNEL_RECEIVE_FAILURE",
            ChronodError::InvalidCommand(_) => "INVALID_COMMAND",
            ChronodError::Serialization(_) => "SERIALIZATION_ERROR",
            ChronodError::Io(_) => "IO_ERROR",
            ChronodError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ChronodError>;
