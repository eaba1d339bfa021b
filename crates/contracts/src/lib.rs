//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data Model
//! - `Event` is created once by an `EventSource` and never mutated afterwards
//! - Field paths resolve through `Event::lookup`, shared by routes and templates

mod config;
mod error;
mod event;
mod field_path;
mod predicate;
mod sink;
mod source;
mod template_value;

pub use config::*;
pub use error::*;
pub use event::*;
pub use field_path::FieldPath;
pub use predicate::Matcher;
pub use sink::*;
pub use source::*;
pub use template_value::TemplateValue;
