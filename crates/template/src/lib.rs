//! # Template
//!
//! Payload templating for sinks.
//!
//! Responsibilities:
//! - Compile a configured `TemplateValue` once, rejecting malformed `{{ }}` text
//! - Render it against an `Event`, keeping the layout's shape
//! - Keep native types when a leaf is a single expression
//!
//! # Example
//!
//! ```ignore
//! use template::Template;
//!
//! let tpl = Template::compile(&layout, "detail")?;
//! let payload: serde_json::Value = tpl.render(&event)?;
//! ```

mod error;
mod expr;
mod template;

pub use error::RenderError;
pub use expr::{Accessor, Expr};
pub use template::{Segment, Template};

use contracts::{Event, TemplateValue};
use serde_json::Value;

/// Compile and render in one step
///
/// Sinks compile at construction time; this is for one-off rendering.
pub fn render(value: &TemplateValue, event: &Event) -> Result<Value, RenderError> {
    let template = Template::compile(value, "$").map_err(|e| RenderError::Malformed {
        message: e.to_string(),
    })?;
    template.render(event)
}
