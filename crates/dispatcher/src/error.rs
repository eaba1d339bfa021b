//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Receiver name registered twice
    #[error("duplicate receiver '{name}'")]
    DuplicateReceiver { name: String },

    /// Sink creation error
    #[error("failed to create {sink} sink for receiver '{receiver}': {message}")]
    SinkCreation {
        receiver: String,
        sink: String,
        message: String,
    },

    /// Configuration error (from contract)
    #[error("configuration error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(
        receiver: impl Into<String>,
        sink: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::SinkCreation {
            receiver: receiver.into(),
            sink: sink.into(),
            message: message.into(),
        }
    }
}

impl From<DispatcherError> for contracts::ContractError {
    fn from(err: DispatcherError) -> Self {
        match err {
            DispatcherError::DuplicateReceiver { name } => Self::DuplicateReceiver { name },
            DispatcherError::SinkCreation {
                receiver,
                sink,
                message,
            } => Self::sink_construction(receiver, sink, message),
            DispatcherError::Contract(inner) => inner,
        }
    }
}
