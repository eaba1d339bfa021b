//! Template error types

use thiserror::Error;

/// Rendering failure for one template
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// Expression names a field the event does not have
    #[error("field not found: {path}")]
    FieldNotFound { path: String },

    /// Template text could not be compiled
    #[error("malformed template: {message}")]
    Malformed { message: String },
}
