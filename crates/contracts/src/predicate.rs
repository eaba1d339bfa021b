//! Predicate compilation shared by config validation and the router

use regex::Regex;

use crate::{ContractError, FieldPath, PredicateConfig};

/// How a field value is compared
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact string equality
    Exact(String),
    /// Regular expression search (unanchored)
    Pattern(Regex),
}

impl Matcher {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == text,
            Self::Pattern(re) => re.is_match(text),
        }
    }
}

impl PredicateConfig {
    /// Parse the field path and build the matcher
    ///
    /// Exactly one of `value` and `pattern` must be set. `location` names
    /// the predicate in errors (e.g. `route.routes[0].match[1]`).
    pub fn compile(&self, location: &str) -> Result<(FieldPath, Matcher), ContractError> {
        let path = FieldPath::parse(&self.field).ok_or_else(|| {
            ContractError::config_validation(
                format!("{location}.field"),
                format!("invalid field path '{}'", self.field),
            )
        })?;

        let matcher = match (&self.value, &self.pattern) {
            (Some(value), None) => Matcher::Exact(value.clone()),
            (None, Some(pattern)) => Regex::new(pattern).map(Matcher::Pattern).map_err(|e| {
                ContractError::InvalidPattern {
                    field: self.field.clone(),
                    pattern: pattern.clone(),
                    message: e.to_string(),
                }
            })?,
            (Some(_), Some(_)) => {
                return Err(ContractError::config_validation(
                    location,
                    "set either 'value' or 'pattern', not both",
                ))
            }
            (None, None) => {
                return Err(ContractError::config_validation(
                    location,
                    "one of 'value' or 'pattern' is required",
                ))
            }
        };

        Ok((path, matcher))
    }
}
