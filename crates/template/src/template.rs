//! Compiled template tree

use contracts::{ContractError, Event, TemplateValue};
use serde_json::{Map, Value};

use crate::{Expr, RenderError};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Piece of a string leaf
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expr(Expr),
}

/// Template compiled from a `TemplateValue`
///
/// Mirrors the layout's shape: lists keep their order, maps their key set.
#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    /// Leaf with nothing to substitute
    Literal(Value),
    /// String leaf that is exactly one expression; keeps the native type
    Expr(Expr),
    /// String leaf mixing text and expressions; always renders a string
    Text(Vec<Segment>),
    List(Vec<Template>),
    Map(Vec<(String, Template)>),
}

impl Template {
    /// Compile a layout
    ///
    /// `location` names the layout in error messages (e.g. `detail`).
    ///
    /// # Errors
    /// Unclosed `{{` or an unparsable expression.
    pub fn compile(value: &TemplateValue, location: &str) -> Result<Self, ContractError> {
        match value {
            TemplateValue::Null => Ok(Self::Literal(Value::Null)),
            TemplateValue::Bool(b) => Ok(Self::Literal(Value::Bool(*b))),
            TemplateValue::Number(n) => Ok(Self::Literal(Value::Number(n.clone()))),
            TemplateValue::String(s) => {
                compile_string(s).map_err(|message| ContractError::template(location, message))
            }
            TemplateValue::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| Self::compile(item, &format!("{location}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            TemplateValue::Map(map) => map
                .iter()
                .map(|(key, item)| {
                    Self::compile(item, &format!("{location}.{key}")).map(|t| (key.clone(), t))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Map),
        }
    }

    /// Render against an event
    ///
    /// # Errors
    /// `FieldNotFound` for the first expression naming a missing field.
    pub fn render(&self, event: &Event) -> Result<Value, RenderError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Expr(expr) => expr.eval(event),
            Self::Text(segments) => {
                let mut out = String::new();
                for segment in segments {
                    match segment {
                        Segment::Text(text) => out.push_str(text),
                        Segment::Expr(expr) => match expr.eval(event)? {
                            Value::String(s) => out.push_str(&s),
                            other => out.push_str(&other.to_string()),
                        },
                    }
                }
                Ok(Value::String(out))
            }
            Self::List(items) => items
                .iter()
                .map(|item| item.render(event))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Self::Map(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, item) in entries {
                    map.insert(key.clone(), item.render(event)?);
                }
                Ok(Value::Object(map))
            }
        }
    }
}

fn compile_string(raw: &str) -> Result<Template, String> {
    let segments = parse_segments(raw)?;

    match segments.as_slice() {
        [] => Ok(Template::Literal(Value::String(String::new()))),
        [Segment::Text(text)] => Ok(Template::Literal(Value::String(text.clone()))),
        [Segment::Expr(expr)] => Ok(Template::Expr(expr.clone())),
        _ => Ok(Template::Text(segments)),
    }
}

fn parse_segments(raw: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut rest = raw;

    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            segments.push(Segment::Text(rest[..start].to_string()));
        }
        let after_open = &rest[start + OPEN.len()..];
        let end = after_open
            .find(CLOSE)
            .ok_or_else(|| format!("unclosed '{OPEN}' in \"{raw}\""))?;

        let expr = Expr::parse(&after_open[..end]).map_err(|e| format!("{e} in \"{raw}\""))?;
        segments.push(Segment::Expr(expr));
        rest = &after_open[end + CLOSE.len()..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use contracts::{EventType, InvolvedObject, Reporter};

    fn sample_event() -> Event {
        Event {
            name: "nginx.17a".into(),
            namespace: "default".into(),
            event_type: EventType::Warning,
            reason: "Pulled".into(),
            message: "Successfully pulled image \"nginx:latest\"".into(),
            count: 1,
            involved_object: InvolvedObject {
                kind: "Pod".into(),
                name: "nginx-server-123abc-456def".into(),
                ..Default::default()
            },
            source: Reporter::default(),
            first_timestamp: Utc.timestamp_millis_opt(1_699_999_999_000).unwrap(),
            last_timestamp: None,
            cluster_name: None,
        }
    }

    fn layout(yaml: &str) -> TemplateValue {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_render_event_fields() {
        let tpl = Template::compile(
            &layout(
                r#"
message: "{{.Message}}"
kind: "{{.InvolvedObject.Kind}}"
name: "{{.InvolvedObject.Name}}"
namespace: "{{.Namespace}}"
type: "{{.Type}}"
"#,
            ),
            "detail",
        )
        .unwrap();

        let rendered = tpl.render(&sample_event()).unwrap();
        assert_eq!(
            rendered,
            serde_json::json!({
                "message": "Successfully pulled image \"nginx:latest\"",
                "kind": "Pod",
                "name": "nginx-server-123abc-456def",
                "namespace": "default",
                "type": "Warning",
            })
        );
    }

    #[test]
    fn test_render_preserves_shape() {
        let tpl = Template::compile(
            &layout(
                r#"
detail:
  message: "{{ .Message }}"
  tags: [sre, ops]
eventType: kube-event
region: us-west-2
createdAt: "{{ .GetTimestampMs }}"
"#,
            ),
            "layout",
        )
        .unwrap();

        let rendered = tpl.render(&sample_event()).unwrap();
        assert_eq!(rendered["eventType"], "kube-event");
        assert_eq!(rendered["detail"]["message"], sample_event().message);
        assert_eq!(rendered["detail"]["tags"], serde_json::json!(["sre", "ops"]));
        assert_eq!(rendered["createdAt"], serde_json::json!(1_699_999_999_000_i64));
        assert!(rendered["createdAt"].is_number());
        assert_eq!(rendered.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_render_is_deterministic() {
        let tpl = Template::compile(
            &layout("{a: '{{ .Reason }}', b: [1, '{{ .Count }}'], c: {d: '{{ .GetTimestampISO8601 }}'}}"),
            "layout",
        )
        .unwrap();
        let ev = sample_event();
        assert_eq!(tpl.render(&ev).unwrap(), tpl.render(&ev).unwrap());
    }

    #[test]
    fn test_mixed_text_renders_string() {
        let tpl = Template::compile(
            &TemplateValue::from("{{ .Namespace }}/{{ .InvolvedObject.Name }} x{{ .Count }}"),
            "layout",
        )
        .unwrap();
        assert_eq!(
            tpl.render(&sample_event()).unwrap(),
            Value::from("default/nginx-server-123abc-456def x1")
        );
    }

    #[test]
    fn test_single_field_keeps_native_type() {
        let tpl = Template::compile(&TemplateValue::from("{{ .Count }}"), "layout").unwrap();
        assert_eq!(tpl.render(&sample_event()).unwrap(), Value::from(1));
    }

    #[test]
    fn test_literals_pass_through() {
        let tpl = Template::compile(&layout("{n: 3, b: false, z: ~, s: 'plain }}'}"), "l").unwrap();
        let rendered = tpl.render(&sample_event()).unwrap();
        assert_eq!(rendered, serde_json::json!({"n": 3, "b": false, "z": null, "s": "plain }}"}));
    }

    #[test]
    fn test_field_not_found() {
        let tpl = Template::compile(&layout("{a: {b: '{{ .Nope }}'}}"), "layout").unwrap();
        assert_eq!(
            tpl.render(&sample_event()),
            Err(RenderError::FieldNotFound {
                path: "Nope".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_template_reports_location() {
        let err = Template::compile(&layout("{a: [ok, '{{ .Message']}"), "detail").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("detail.a[1]"), "got: {text}");
        assert!(text.contains("unclosed"), "got: {text}");

        assert!(Template::compile(&TemplateValue::from("{{ }}"), "x").is_err());
    }
}
