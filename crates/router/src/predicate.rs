//! Match and drop predicates

use contracts::{ContractError, Event, FieldPath, PredicateConfig};
use serde_json::Value;

pub use contracts::Matcher;

/// Field path plus matcher
#[derive(Debug, Clone)]
pub struct Predicate {
    path: FieldPath,
    matcher: Matcher,
}

impl Predicate {
    /// Compile one predicate
    ///
    /// Exactly one of `value` and `pattern` must be set.
    pub fn compile(config: &PredicateConfig, location: &str) -> Result<Self, ContractError> {
        let (path, matcher) = config.compile(location)?;
        Ok(Self { path, matcher })
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Evaluate against an event
    ///
    /// `Err` carries the unresolved path; callers treat it as a non-match.
    pub fn evaluate(&self, event: &Event) -> Result<bool, &FieldPath> {
        let value = event.lookup(&self.path).ok_or(&self.path)?;
        Ok(match &value {
            Value::String(s) => self.matcher.is_match(s),
            other => self.matcher.is_match(&other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::event;

    fn predicate(field: &str, value: Option<&str>, pattern: Option<&str>) -> Result<Predicate, ContractError> {
        Predicate::compile(
            &PredicateConfig {
                field: field.to_string(),
                value: value.map(str::to_string),
                pattern: pattern.map(str::to_string),
            },
            "route.match[0]",
        )
    }

    #[test]
    fn test_exact_value() {
        let p = predicate("involvedObject.kind", Some("Pod"), None).unwrap();
        assert_eq!(p.evaluate(&event("Pod", "default")), Ok(true));
        assert_eq!(p.evaluate(&event("PodTemplate", "default")), Ok(false));
    }

    #[test]
    fn test_pattern_is_unanchored() {
        let p = predicate("namespace", None, Some("kube")).unwrap();
        assert_eq!(p.evaluate(&event("Pod", "kube-system")), Ok(true));

        let anchored = predicate("namespace", None, Some("^default$")).unwrap();
        assert_eq!(anchored.evaluate(&event("Pod", "default-2")), Ok(false));
    }

    #[test]
    fn test_non_string_value_compares_as_json() {
        let p = predicate("count", Some("1"), None).unwrap();
        assert_eq!(p.evaluate(&event("Pod", "default")), Ok(true));
    }

    #[test]
    fn test_missing_field_is_error() {
        let p = predicate("involvedObject.labels.team", Some("sre"), None).unwrap();
        let ev = event("Pod", "default");
        assert_eq!(p.evaluate(&ev).unwrap_err().to_string(), "involvedObject.labels.team");
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            predicate("namespace", None, Some("(")),
            Err(ContractError::InvalidPattern { .. })
        ));
        assert!(matches!(
            predicate("namespace", Some("a"), Some("b")),
            Err(ContractError::ConfigValidation { .. })
        ));
        assert!(matches!(
            predicate("namespace", None, None),
            Err(ContractError::ConfigValidation { .. })
        ));
        assert!(predicate("a..b", Some("x"), None).is_err());
    }
}
