//! Per-execution variable bag and prior-run history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Variable name under which the triggering event is seeded
pub const EVENT_VARIABLE: &str = "event";

/// Mutable variables of one in-flight execution.
///
/// Seeded with the triggering event and extended with each node's output.
/// Writes are last-write-wins: a later node using the same output variable
/// replaces the earlier value.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    event: Value,
    history: ExecutionHistory,
    variables: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new(event: Value) -> Self {
        let mut variables = Map::new();
        variables.insert(EVENT_VARIABLE.to_string(), event.clone());

        Self {
            event,
            history: ExecutionHistory::default(),
            variables,
        }
    }

    pub fn with_history(mut self, history: ExecutionHistory) -> Self {
        self.history = history;
        self
    }

    pub fn event(&self) -> &Value {
        &self.event
    }

    pub fn history(&self) -> &ExecutionHistory {
        &self.history
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Store a value, returning the one it replaced
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.variables.insert(name.into(), value)
    }

    /// Final variables, persisted as the execution result
    pub fn into_result(self) -> Value {
        Value::Object(self.variables)
    }
}

/// Summary of the most recent completed execution of the same workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionHistory {
    pub last_execution_id: Option<String>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub last_result: Option<Value>,
}

impl ExecutionHistory {
    pub fn is_empty(&self) -> bool {
        self.last_execution_id.is_none()
    }

    /// Document addressed by `execution.*` paths
    pub fn as_value(&self) -> Value {
        json!({
            "lastExecutionId": self.last_execution_id,
            "lastCompletedAt": self.last_completed_at.map(|t| t.to_rfc3339()),
            "lastResult": self.last_result.clone().unwrap_or(Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_seeded_with_event() {
        let ctx = ExecutionContext::new(json!({"value": 150}));

        assert_eq!(ctx.event(), &json!({"value": 150}));
        assert_eq!(ctx.get(EVENT_VARIABLE), Some(&json!({"value": 150})));
        assert!(ctx.history().is_empty());
    }

    #[test]
    fn test_set_is_last_write_wins() {
        let mut ctx = ExecutionContext::new(json!({}));

        assert!(ctx.set("promoCode", json!({"code": "FIRST"})).is_none());
        let replaced = ctx.set("promoCode", json!({"code": "SECOND"}));

        assert_eq!(replaced, Some(json!({"code": "FIRST"})));
        assert_eq!(ctx.get("promoCode"), Some(&json!({"code": "SECOND"})));
    }

    #[test]
    fn test_history_document_shape() {
        let history = ExecutionHistory {
            last_execution_id: Some("exec-1".to_string()),
            last_completed_at: None,
            last_result: Some(json!({"promoCode": {"code": "ABC"}})),
        };
        let doc = history.as_value();

        assert_eq!(doc["lastExecutionId"], json!("exec-1"));
        assert_eq!(doc["lastResult"]["promoCode"]["code"], json!("ABC"));
        assert!(doc["lastCompletedAt"].is_null());
    }
}
