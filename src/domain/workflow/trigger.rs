//! Trigger specification matched against incoming events

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::predicate::ConditionOperator;
use super::resolver::get_nested_field;

/// Field filter applied to the event snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventFilter {
    /// Dotted path into the event, e.g. `itemCategory` or `properties.plan`
    pub field: String,

    #[serde(default)]
    pub op: ConditionOperator,

    #[serde(default)]
    pub value: Value,
}

impl EventFilter {
    pub fn new(field: impl Into<String>, op: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn equals(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, ConditionOperator::Eq, value)
    }

    /// Filters that cannot be evaluated do not match
    pub fn matches(&self, event: &Value) -> bool {
        let field = self.field.strip_prefix("event.").unwrap_or(&self.field);
        let actual = get_nested_field(event, field).cloned().unwrap_or(Value::Null);
        self.op.evaluate(&actual, &self.value).unwrap_or(false)
    }
}

/// Entry condition of a workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSpec {
    /// Compared with the event category
    pub event_type: String,

    /// Compared with the event name when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<EventFilter>,
}

impl TriggerSpec {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            event_name: None,
            filters: Vec::new(),
        }
    }

    pub fn with_event_name(mut self, name: impl Into<String>) -> Self {
        self.event_name = Some(name.into());
        self
    }

    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Check an event snapshot against this trigger.
    ///
    /// Type and name comparisons ignore ASCII case; every filter must hold.
    pub fn matches(&self, event: &Value) -> bool {
        self.mismatch_reason(event).is_none()
    }

    /// Human-readable reason an event does not match, `None` if it does
    pub fn mismatch_reason(&self, event: &Value) -> Option<String> {
        let text = |key: &str| event.get(key).and_then(Value::as_str).unwrap_or_default();

        if !self.event_type.eq_ignore_ascii_case(text("category")) {
            return Some(format!(
                "event category '{}' does not match trigger type '{}'",
                text("category"),
                self.event_type
            ));
        }

        if let Some(name) = &self.event_name {
            if !name.eq_ignore_ascii_case(text("name")) {
                return Some(format!(
                    "event name '{}' does not match trigger name '{}'",
                    text("name"),
                    name
                ));
            }
        }

        self.filters
            .iter()
            .find(|filter| !filter.matches(event))
            .map(|filter| {
                format!(
                    "filter on '{}' ({} {}) did not match",
                    filter.field,
                    filter.op.symbol(),
                    filter.value
                )
            })
    }
}
