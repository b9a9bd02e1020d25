//! Data resolution for `{{source.path}}` expressions
//!
//! Sources:
//! - `event.<path>` - the triggering event snapshot
//! - `execution.<path>` - the most recent completed run of the same workflow
//!   (`lastResult`, `lastExecutionId`, `lastCompletedAt`)
//! - `workflow.<name>` / `context.<name>` - variables of the current execution
//!
//! Missing paths resolve to null. Interpolation leaves a placeholder that
//! resolves to null untouched in the output text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use super::context::ExecutionContext;

/// Matches `{{ source.path }}`; group 1 is the trimmed expression
static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").unwrap());

/// Data source addressed by the first path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Event,
    Execution,
    Context,
}

impl DataSource {
    pub fn parse(segment: &str) -> Option<Self> {
        match segment {
            "event" => Some(Self::Event),
            "execution" => Some(Self::Execution),
            "workflow" | "context" => Some(Self::Context),
            _ => None,
        }
    }
}

/// Resolves expressions against one execution's data surfaces
#[derive(Debug)]
pub struct DataResolver<'a> {
    context: &'a ExecutionContext,
    history: Value,
}

impl<'a> DataResolver<'a> {
    pub fn new(context: &'a ExecutionContext) -> Self {
        Self {
            history: context.history().as_value(),
            context,
        }
    }

    /// Look up a bare expression such as `event.value`.
    ///
    /// Accepts an optional `{{ }}` wrapper. Unknown sources and missing
    /// paths yield `Value::Null`.
    pub fn lookup(&self, expression: &str) -> Value {
        let expression = strip_braces(expression);
        let (source, path) = match expression.split_once('.') {
            Some((source, path)) => (source, Some(path)),
            None => (expression, None),
        };

        match DataSource::parse(source) {
            Some(DataSource::Event) => resolve_path(self.context.event(), path),
            Some(DataSource::Execution) => resolve_path(&self.history, path),
            Some(DataSource::Context) => match path {
                Some(path) => {
                    let (name, rest) = match path.split_once('.') {
                        Some((name, rest)) => (name, Some(rest)),
                        None => (path, None),
                    };
                    self.context
                        .get(name)
                        .map(|var| resolve_path(var, rest))
                        .unwrap_or(Value::Null)
                }
                None => Value::Object(self.context.variables().clone()),
            },
            None => Value::Null,
        }
    }

    /// Resolve a template to a JSON value.
    ///
    /// A template that is exactly one placeholder yields the raw value
    /// (which may be null); anything else is interpolated into a string.
    pub fn resolve_value(&self, template: &str) -> Value {
        let trimmed = template.trim();
        if let Some(caps) = PLACEHOLDER_PATTERN.captures(trimmed) {
            if caps.get(0).is_some_and(|m| m.start() == 0 && m.end() == trimmed.len()) {
                return self.lookup(&caps[1]);
            }
        }

        Value::String(self.interpolate(template))
    }

    /// Substitute every placeholder in `template` independently
    pub fn interpolate(&self, template: &str) -> String {
        PLACEHOLDER_PATTERN
            .replace_all(template, |caps: &Captures<'_>| match self.lookup(&caps[1]) {
                Value::Null => caps[0].to_string(),
                value => value_to_string(&value),
            })
            .into_owned()
    }

    /// Expressions referenced by a template, in order of appearance
    pub fn references(template: &str) -> Vec<String> {
        PLACEHOLDER_PATTERN
            .captures_iter(template)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    pub fn has_placeholders(template: &str) -> bool {
        PLACEHOLDER_PATTERN.is_match(template)
    }
}

fn resolve_path(root: &Value, path: Option<&str>) -> Value {
    match path {
        Some(path) => get_nested_field(root, path).cloned().unwrap_or(Value::Null),
        None => root.clone(),
    }
}

fn strip_braces(expression: &str) -> &str {
    let trimmed = expression.trim();
    trimmed
        .strip_prefix("{{")
        .and_then(|rest| rest.strip_suffix("}}"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Null-safe dotted path traversal; numeric segments index into arrays
pub fn get_nested_field<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = value;

    for part in path.split('.').filter(|p| !p.is_empty()) {
        current = match current {
            Value::Object(obj) => obj.get(part)?,
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    if current.is_null() { None } else { Some(current) }
}

/// Text form used when a value is spliced into a string
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::context::ExecutionHistory;
    use serde_json::json;

    fn context() -> ExecutionContext {
        let mut ctx = ExecutionContext::new(json!({
            "value": 150,
            "name": "add_to_cart",
            "properties": {"items": [{"sku": "A-1"}, {"sku": "B-2"}]}
        }))
        .with_history(ExecutionHistory {
            last_execution_id: Some("exec-prev".to_string()),
            last_completed_at: None,
            last_result: Some(json!({"promoCode": {"code": "OLD-CODE"}})),
        });
        ctx.set("promoCode", json!({"code": "SAVE10", "discountValue": 10}));
        ctx
    }

    #[test]
    fn test_event_value_interpolates_as_text() {
        let ctx = context();
        let resolver = DataResolver::new(&ctx);

        assert_eq!(resolver.interpolate("{{event.value}}"), "150");
        assert_eq!(resolver.resolve_value("{{event.value}}"), json!(150));
    }

    #[test]
    fn test_missing_field_is_null_and_placeholder_kept() {
        let ctx = context();
        let resolver = DataResolver::new(&ctx);

        assert_eq!(resolver.resolve_value("{{event.missingField}}"), Value::Null);
        assert_eq!(
            resolver.interpolate("Hello {{event.missingField}}, you spent {{event.value}}"),
            "Hello {{event.missingField}}, you spent 150"
        );
    }

    #[test]
    fn test_nested_and_array_paths() {
        let ctx = context();
        let resolver = DataResolver::new(&ctx);

        assert_eq!(resolver.lookup("event.properties.items.1.sku"), json!("B-2"));
        assert_eq!(resolver.lookup("event.properties.items.9.sku"), Value::Null);
        assert_eq!(resolver.lookup("event.value.deeper"), Value::Null);
    }

    #[test]
    fn test_workflow_and_context_aliases() {
        let ctx = context();
        let resolver = DataResolver::new(&ctx);

        assert_eq!(resolver.interpolate("{{workflow.promoCode.code}}"), "SAVE10");
        assert_eq!(resolver.interpolate("{{ context.promoCode.code }}"), "SAVE10");
        assert_eq!(resolver.lookup("context.event.value"), json!(150));
    }

    #[test]
    fn test_execution_history() {
        let ctx = context();
        let resolver = DataResolver::new(&ctx);

        assert_eq!(
            resolver.interpolate("{{execution.lastResult.promoCode.code}}"),
            "OLD-CODE"
        );
        assert_eq!(resolver.lookup("execution.lastExecutionId"), json!("exec-prev"));
    }

    #[test]
    fn test_absent_history_resolves_to_null() {
        let ctx = ExecutionContext::new(json!({}));
        let resolver = DataResolver::new(&ctx);

        assert_eq!(resolver.lookup("execution.lastResult.promoCode.code"), Value::Null);
        assert_eq!(
            resolver.interpolate("{{execution.lastResult.promoCode.code}}"),
            "{{execution.lastResult.promoCode.code}}"
        );
    }

    #[test]
    fn test_unknown_source_is_null() {
        let ctx = context();
        let resolver = DataResolver::new(&ctx);

        assert_eq!(resolver.lookup("user.name"), Value::Null);
    }

    #[test]
    fn test_object_values_render_as_json() {
        let ctx = context();
        let resolver = DataResolver::new(&ctx);

        assert_eq!(
            resolver.interpolate("items={{event.properties.items.0}}"),
            r#"items={"sku":"A-1"}"#
        );
    }

    #[test]
    fn test_references() {
        let refs = DataResolver::references("{{event.userId}} got {{ workflow.promoCode.code }}");
        assert_eq!(refs, vec!["event.userId", "workflow.promoCode.code"]);
        assert!(DataResolver::has_placeholders("{{event.id}}"));
        assert!(!DataResolver::has_placeholders("plain text"));
    }
}
