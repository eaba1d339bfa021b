//! Layered error definitions
//!
//! Categorized by stage: config / source / sink

use thiserror::Error;

/// Unified configuration and source error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Two receivers share one name
    #[error("duplicate receiver '{name}'")]
    DuplicateReceiver { name: String },

    /// A route targets a receiver that was never registered
    #[error("route '{route}' references unknown receiver '{name}'")]
    UnknownReceiver { route: String, name: String },

    /// Predicate pattern failed to compile
    #[error("invalid pattern '{pattern}' for field '{field}': {message}")]
    InvalidPattern {
        field: String,
        pattern: String,
        message: String,
    },

    /// Template text could not be compiled
    #[error("malformed template at '{location}': {message}")]
    Template { location: String, message: String },

    /// Sink could not be built (unreachable collector, bad credentials, ...)
    #[error("failed to construct sink '{sink}' for receiver '{receiver}': {message}")]
    SinkConstruction {
        receiver: String,
        sink: String,
        message: String,
    },

    // ===== Source Errors =====
    /// Event source produced something unusable
    #[error("event source '{source_name}' error: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create malformed template error
    pub fn template(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create sink construction error
    pub fn sink_construction(
        receiver: impl Into<String>,
        sink: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::SinkConstruction {
            receiver: receiver.into(),
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create event source error
    pub fn source(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// True for errors that must stop the exporter from starting
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Source { .. } | Self::Io(_) | Self::Other(_))
    }
}

/// Per-delivery failure of a single sink
///
/// Never propagated past the receiver registry; counted and logged there.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Destination unreachable or rejected the payload
    #[error("sink '{sink}' delivery failed: {message}")]
    Delivery { sink: String, message: String },

    /// Payload template could not be rendered against the event
    #[error("sink '{sink}' render failed: {message}")]
    Render { sink: String, message: String },

    /// Event could not be serialized
    #[error("sink '{sink}' serialization failed: {source}")]
    Serialize {
        sink: String,
        #[source]
        source: serde_json::Error,
    },

    /// Send was cancelled by shutdown
    #[error("sink '{sink}' send cancelled")]
    Cancelled { sink: String },

    /// Send exceeded its delivery timeout
    #[error("sink '{sink}' send timed out after {timeout_ms}ms")]
    TimedOut { sink: String, timeout_ms: u64 },

    /// Sink already released its connection
    #[error("sink '{sink}' is closed")]
    Closed { sink: String },
}

impl SinkError {
    /// Create delivery error
    pub fn delivery(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create render error
    pub fn render(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Whether the failure happened before anything reached the destination
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(ContractError::DuplicateReceiver {
            name: "a".into()
        }
        .is_configuration());
        assert!(ContractError::template("route.detail", "unclosed").is_configuration());
        assert!(!ContractError::source("stdin", "bad line").is_configuration());
    }

    #[test]
    fn test_sink_error_display() {
        let err = SinkError::delivery("syslog", "connection refused");
        assert_eq!(
            err.to_string(),
            "sink 'syslog' delivery failed: connection refused"
        );
        assert!(!err.is_render());
        assert!(SinkError::render("eventbridge", "field not found").is_render());
    }
}
