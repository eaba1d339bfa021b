//! TemplateValue - operator supplied payload layout
//!
//! Parsed straight from configuration; string leaves may hold `{{ ... }}`
//! expressions which the `template` crate compiles and renders.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Recursively defined layout value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum TemplateValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<TemplateValue>),
    Map(BTreeMap<String, TemplateValue>),
}

impl From<Value> for TemplateValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<TemplateValue> for Value {
    fn from(value: TemplateValue) -> Self {
        match value {
            TemplateValue::Null => Value::Null,
            TemplateValue::Bool(b) => Value::Bool(b),
            TemplateValue::Number(n) => Value::Number(n),
            TemplateValue::String(s) => Value::String(s),
            TemplateValue::List(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            TemplateValue::Map(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}
