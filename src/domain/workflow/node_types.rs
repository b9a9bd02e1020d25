//! Action node type definitions

use serde::{Deserialize, Serialize};

use crate::domain::action::{
    ActionInput, ActionKind, MessageRequest, PromoCodeRequest, PushRequest, PushTargetRequest,
};

use super::resolver::DataResolver;

/// Kind and configuration of an action node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Entry point; carries no configuration of its own
    Trigger,

    /// Allocate a promo code from a batch
    PromoCode(PromoCodeNode),

    /// Send a push notification
    PushNotification(PushNotificationNode),

    /// Send a WhatsApp or SMS template message
    Message(MessageNode),

    /// Pick one outgoing branch
    Condition(ConditionNode),
}

impl NodeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::PromoCode(_) => "promo_code",
            Self::PushNotification(_) => "push_notification",
            Self::Message(_) => "message",
            Self::Condition(_) => "condition",
        }
    }

    /// Executor kind for nodes dispatched through the action registry
    pub fn action_kind(&self) -> Option<ActionKind> {
        match self {
            Self::PromoCode(_) => Some(ActionKind::PromoCode),
            Self::PushNotification(_) => Some(ActionKind::PushNotification),
            Self::Message(_) => Some(ActionKind::Message),
            Self::Trigger | Self::Condition(_) => None,
        }
    }

    /// Resolve the node's templated fields into a concrete executor input.
    ///
    /// Returns `None` for trigger and condition nodes.
    pub fn resolve_input(&self, resolver: &DataResolver<'_>) -> Option<ActionInput> {
        match self {
            Self::PromoCode(node) => Some(ActionInput::PromoCode(node.resolve(resolver))),
            Self::PushNotification(node) => {
                Some(ActionInput::PushNotification(node.resolve(resolver)))
            }
            Self::Message(node) => Some(ActionInput::Message(node.resolve(resolver))),
            Self::Trigger | Self::Condition(_) => None,
        }
    }
}

/// How a promo code is picked from its batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CodeType {
    #[default]
    Random,
    Sequential,
    Specific,
}

impl CodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Sequential => "sequential",
            Self::Specific => "specific",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeNode {
    pub batch_id: String,

    #[serde(default)]
    pub code_type: CodeType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_code: Option<String>,
}

impl PromoCodeNode {
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            code_type: CodeType::default(),
            specific_code: None,
        }
    }

    pub fn with_code_type(mut self, code_type: CodeType) -> Self {
        self.code_type = code_type;
        self
    }

    pub fn with_specific_code(mut self, code: impl Into<String>) -> Self {
        self.code_type = CodeType::Specific;
        self.specific_code = Some(code.into());
        self
    }

    fn resolve(&self, resolver: &DataResolver<'_>) -> PromoCodeRequest {
        PromoCodeRequest {
            batch_id: resolver.interpolate(&self.batch_id),
            code_type: self.code_type,
            specific_code: self.specific_code.as_deref().map(|c| resolver.interpolate(c)),
        }
    }
}

/// Audience of a push notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PushTarget {
    All,
    Segment {
        #[serde(rename = "segmentId")]
        segment_id: String,
    },
    Users {
        #[serde(rename = "userIds")]
        user_ids: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PushNotificationNode {
    pub title: String,

    pub body: String,

    pub target: PushTarget,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_link: Option<String>,
}

impl PushNotificationNode {
    pub fn new(title: impl Into<String>, body: impl Into<String>, target: PushTarget) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            target,
            image_url: None,
            deep_link: None,
        }
    }

    fn resolve(&self, resolver: &DataResolver<'_>) -> PushRequest {
        let target = match &self.target {
            PushTarget::All => PushTargetRequest::All,
            PushTarget::Segment { segment_id } => PushTargetRequest::Segment {
                segment_id: resolver.interpolate(segment_id),
            },
            PushTarget::Users { user_ids } => PushTargetRequest::Users {
                user_ids: user_ids.iter().map(|id| resolver.interpolate(id)).collect(),
            },
        };

        PushRequest {
            title: resolver.interpolate(&self.title),
            body: resolver.interpolate(&self.body),
            target,
            image_url: self.image_url.as_deref().map(|u| resolver.interpolate(u)),
            deep_link: self.deep_link.as_deref().map(|l| resolver.interpolate(l)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageProvider {
    Whatsapp,
    Sms,
}

impl MessageProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whatsapp => "whatsapp",
            Self::Sms => "sms",
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_to_phone() -> String {
    "{{event.userPhone}}".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageNode {
    pub provider: MessageProvider,

    pub template_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    pub from_phone: String,

    /// Recipient; defaults to the phone number carried by the event
    #[serde(default = "default_to_phone")]
    pub to_phone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_variable1: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_variable2: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_variable3: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_variable: Option<String>,
}

impl MessageNode {
    pub fn new(
        provider: MessageProvider,
        template_name: impl Into<String>,
        from_phone: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            template_name: template_name.into(),
            namespace: None,
            language: default_language(),
            from_phone: from_phone.into(),
            to_phone: default_to_phone(),
            body_variable1: None,
            body_variable2: None,
            body_variable3: None,
            button_variable: None,
        }
    }

    pub fn with_to_phone(mut self, to_phone: impl Into<String>) -> Self {
        self.to_phone = to_phone.into();
        self
    }

    pub fn with_body_variables(mut self, variables: &[&str]) -> Self {
        let mut iter = variables.iter().map(|v| v.to_string());
        self.body_variable1 = iter.next();
        self.body_variable2 = iter.next();
        self.body_variable3 = iter.next();
        self
    }

    pub fn with_button_variable(mut self, variable: impl Into<String>) -> Self {
        self.button_variable = Some(variable.into());
        self
    }

    /// Template variables are positional: an unset slot before a set one is
    /// sent as an empty string, trailing unset slots are dropped.
    fn positional_body_variables(&self, resolver: &DataResolver<'_>) -> Vec<String> {
        let slots = [
            &self.body_variable1,
            &self.body_variable2,
            &self.body_variable3,
        ];
        let used = slots.iter().rposition(|slot| slot.is_some()).map_or(0, |i| i + 1);

        slots[..used]
            .iter()
            .map(|slot| {
                slot.as_deref()
                    .map(|v| resolver.interpolate(v))
                    .unwrap_or_default()
            })
            .collect()
    }

    fn resolve(&self, resolver: &DataResolver<'_>) -> MessageRequest {
        let resolve_opt = |field: &Option<String>| field.as_deref().map(|v| resolver.interpolate(v));

        MessageRequest {
            provider: self.provider,
            template_name: resolver.interpolate(&self.template_name),
            namespace: resolve_opt(&self.namespace),
            language: resolver.interpolate(&self.language),
            from_phone: resolver.interpolate(&self.from_phone),
            to_phone: resolver.interpolate(&self.to_phone),
            body_variables: self.positional_body_variables(resolver),
            button_variable: resolve_opt(&self.button_variable),
        }
    }
}

/// One guarded branch of a condition node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionBranch {
    /// Expression in the predicate language, e.g. `event.value > 100`
    pub predicate: String,
    pub label: String,
}

impl ConditionBranch {
    pub fn new(predicate: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            predicate: predicate.into(),
            label: label.into(),
        }
    }
}

fn default_else_label() -> String {
    "else".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionNode {
    pub branches: Vec<ConditionBranch>,

    #[serde(default = "default_else_label")]
    pub else_label: String,
}

impl ConditionNode {
    pub fn new(branches: Vec<ConditionBranch>) -> Self {
        Self {
            branches,
            else_label: default_else_label(),
        }
    }

    pub fn with_else_label(mut self, label: impl Into<String>) -> Self {
        self.else_label = label.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::ExecutionContext;
    use serde_json::json;

    #[test]
    fn test_promo_code_node_deserialization() {
        let kind: NodeKind = serde_json::from_value(json!({
            "type": "promo_code",
            "batchId": "summer-sale",
            "codeType": "sequential"
        }))
        .unwrap();

        match kind {
            NodeKind::PromoCode(node) => {
                assert_eq!(node.batch_id, "summer-sale");
                assert_eq!(node.code_type, CodeType::Sequential);
                assert!(node.specific_code.is_none());
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_push_target_modes() {
        let kind: NodeKind = serde_json::from_value(json!({
            "type": "push_notification",
            "title": "Hi",
            "body": "Your cart misses you",
            "target": {"mode": "users", "userIds": ["{{event.userId}}"]}
        }))
        .unwrap();

        let NodeKind::PushNotification(node) = kind else {
            panic!("expected push node");
        };
        assert_eq!(
            node.target,
            PushTarget::Users {
                user_ids: vec!["{{event.userId}}".to_string()]
            }
        );
    }

    #[test]
    fn test_message_node_defaults() {
        let kind: NodeKind = serde_json::from_value(json!({
            "type": "message",
            "provider": "whatsapp",
            "templateName": "cart_reminder",
            "fromPhone": "+15550000",
            "bodyVariable1": "{{workflow.promoCode.code}}"
        }))
        .unwrap();

        let NodeKind::Message(node) = kind else {
            panic!("expected message node");
        };
        assert_eq!(node.language, "en");
        assert_eq!(node.to_phone, "{{event.userPhone}}");
        assert_eq!(node.body_variable1.as_deref(), Some("{{workflow.promoCode.code}}"));
    }

    #[test]
    fn test_body_variables_keep_their_positions() {
        let context = ExecutionContext::new(json!({"itemCategory": "shoes"}));
        let resolver = DataResolver::new(&context);

        let mut node = MessageNode::new(MessageProvider::Whatsapp, "cart_reminder", "+15550000");
        node.body_variable2 = Some("{{event.itemCategory}}".to_string());
        assert_eq!(node.resolve(&resolver).body_variables, vec!["", "shoes"]);

        node.body_variable1 = Some("first".to_string());
        node.body_variable2 = None;
        node.body_variable3 = Some("third".to_string());
        assert_eq!(node.resolve(&resolver).body_variables, vec!["first", "", "third"]);

        let bare = MessageNode::new(MessageProvider::Sms, "cart_reminder", "+15550000");
        assert!(bare.resolve(&resolver).body_variables.is_empty());
    }

    #[test]
    fn test_condition_node_default_else_label() {
        let kind: NodeKind = serde_json::from_value(json!({
            "type": "condition",
            "branches": [{"predicate": "event.value > 100", "label": "high"}]
        }))
        .unwrap();

        let NodeKind::Condition(node) = kind else {
            panic!("expected condition node");
        };
        assert_eq!(node.else_label, "else");
        assert_eq!(node.branches[0].label, "high");
    }

    #[test]
    fn test_type_names_and_action_kinds() {
        assert_eq!(NodeKind::Trigger.type_name(), "trigger");
        assert!(NodeKind::Trigger.action_kind().is_none());
        assert_eq!(
            NodeKind::PromoCode(PromoCodeNode::new("b")).action_kind(),
            Some(ActionKind::PromoCode)
        );
        assert!(NodeKind::Condition(ConditionNode::new(vec![])).action_kind().is_none());
    }
}
