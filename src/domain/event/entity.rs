//! User event entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

/// A tracked user event as delivered by the collection pipeline.
///
/// Field names follow the wire format (camelCase) because data resolution
/// paths such as `{{event.itemCategory}}` address them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEvent {
    #[serde(default = "generate_event_id")]
    pub id: String,

    pub name: String,

    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

fn generate_event_id() -> String {
    Uuid::new_v4().to_string()
}

impl UserEvent {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: generate_event_id(),
            name: name.into(),
            category: category.into(),
            action: None,
            value: None,
            item_name: None,
            item_id: None,
            item_category: None,
            user_id: None,
            user_phone: None,
            path: None,
            page_title: None,
            timestamp: Utc::now(),
            properties: Map::new(),
            organization_id: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<Number>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_user_phone(mut self, phone: impl Into<String>) -> Self {
        self.user_phone = Some(phone.into());
        self
    }

    pub fn with_item_category(mut self, category: impl Into<String>) -> Self {
        self.item_category = Some(category.into());
        self
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// JSON snapshot stored on the execution and exposed as `event.*`
    pub fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_wire_format() {
        let event: UserEvent = serde_json::from_value(json!({
            "id": "evt-1",
            "name": "add_to_cart",
            "category": "ecommerce",
            "value": 150,
            "itemCategory": "shoes",
            "userPhone": "+15550100",
            "properties": {"color": "red"}
        }))
        .unwrap();

        assert_eq!(event.id, "evt-1");
        assert_eq!(event.item_category.as_deref(), Some("shoes"));
        assert_eq!(event.value, Some(Number::from(150)));
        assert_eq!(event.properties["color"], json!("red"));
    }

    #[test]
    fn test_missing_id_is_generated() {
        let event: UserEvent =
            serde_json::from_value(json!({"name": "page_view", "category": "navigation"}))
                .unwrap();
        assert!(!event.id.is_empty());
    }

    #[test]
    fn test_snapshot_uses_camel_case() {
        let event = UserEvent::new("purchase", "ecommerce")
            .with_value(150)
            .with_user_phone("+15550100");
        let snapshot = event.snapshot();

        assert_eq!(snapshot["value"], json!(150));
        assert_eq!(snapshot["userPhone"], json!("+15550100"));
        assert!(snapshot.get("itemName").is_none());
    }
}
