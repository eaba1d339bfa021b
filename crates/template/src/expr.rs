//! Expressions inside `{{ ... }}`

use contracts::{Event, FieldPath};
use serde_json::Value;

use crate::RenderError;

/// Computed event property usable in templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    /// `GetTimestampMs`: millisecond epoch, renders as a number
    TimestampMs,
    /// `GetTimestampISO8601`: RFC 3339 string
    TimestampIso8601,
}

impl Accessor {
    fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("GetTimestampMs") {
            Some(Self::TimestampMs)
        } else if name.eq_ignore_ascii_case("GetTimestampISO8601") {
            Some(Self::TimestampIso8601)
        } else {
            None
        }
    }

    fn eval(self, event: &Event) -> Value {
        match self {
            Self::TimestampMs => Value::from(event.timestamp_ms()),
            Self::TimestampIso8601 => Value::from(event.timestamp_iso8601()),
        }
    }
}

/// One parsed expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Field(FieldPath),
    Accessor(Accessor),
}

impl Expr {
    /// Parse the text between the braces
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("empty expression".to_string());
        }

        let path = FieldPath::parse(trimmed)
            .ok_or_else(|| format!("invalid field path '{trimmed}'"))?;

        if let [single] = path.segments() {
            if let Some(accessor) = Accessor::from_name(single) {
                return Ok(Self::Accessor(accessor));
            }
        }
        Ok(Self::Field(path))
    }

    /// Evaluate against an event, keeping the value's native type
    pub fn eval(&self, event: &Event) -> Result<Value, RenderError> {
        match self {
            Self::Field(path) => event.lookup(path).ok_or_else(|| RenderError::FieldNotFound {
                path: path.to_string(),
            }),
            Self::Accessor(accessor) => Ok(accessor.eval(event)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accessor() {
        assert_eq!(
            Expr::parse(" .GetTimestampMs ").unwrap(),
            Expr::Accessor(Accessor::TimestampMs)
        );
        assert_eq!(
            Expr::parse("getTimestampISO8601").unwrap(),
            Expr::Accessor(Accessor::TimestampIso8601)
        );
    }

    #[test]
    fn test_parse_field() {
        let Expr::Field(path) = Expr::parse(".InvolvedObject.Kind").unwrap() else {
            panic!("expected field");
        };
        assert_eq!(path.to_string(), "InvolvedObject.Kind");
    }

    #[test]
    fn test_parse_errors() {
        assert!(Expr::parse("   ").is_err());
        assert!(Expr::parse(".a..b").is_err());
        assert!(Expr::parse("toJson .Message").is_err());
    }
}
