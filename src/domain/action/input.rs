//! Resolved executor inputs
//!
//! Node configurations are templates; these are the concrete values produced
//! by data resolution right before an executor runs. They are recorded as the
//! step's input snapshot.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::executor::ActionKind;
use crate::domain::workflow::{CodeType, MessageProvider};

/// Input handed to an action executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionInput {
    PromoCode(PromoCodeRequest),
    PushNotification(PushRequest),
    Message(MessageRequest),
}

impl ActionInput {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::PromoCode(_) => "promo_code",
            Self::PushNotification(_) => "push_notification",
            Self::Message(_) => "message",
        }
    }

    /// Executor kind this input is meant for
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::PromoCode(_) => ActionKind::PromoCode,
            Self::PushNotification(_) => ActionKind::PushNotification,
            Self::Message(_) => ActionKind::Message,
        }
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_specific_code"))]
pub struct PromoCodeRequest {
    #[validate(
        length(min = 1, message = "batchId is required"),
        custom(function = "validate_resolved")
    )]
    pub batch_id: String,

    pub code_type: CodeType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_code: Option<String>,
}

fn validate_specific_code(request: &PromoCodeRequest) -> Result<(), ValidationError> {
    let has_code = request
        .specific_code
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty() && !c.contains("{{"));

    if request.code_type == CodeType::Specific && !has_code {
        return Err(ValidationError::new("specific_code")
            .with_message("specificCode is required when codeType is specific".into()));
    }
    Ok(())
}

/// Resolved push audience
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PushTargetRequest {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_push_target"))]
pub struct PushRequest {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,

    #[validate(length(min = 1, message = "body is required"))]
    pub body: String,

    pub target: PushTargetRequest,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_link: Option<String>,
}

fn validate_push_target(request: &PushRequest) -> Result<(), ValidationError> {
    let valid = match &request.target {
        PushTargetRequest::All => true,
        PushTargetRequest::Segment { segment_id } => {
            !segment_id.trim().is_empty() && !segment_id.contains("{{")
        }
        PushTargetRequest::Users { user_ids } => {
            !user_ids.is_empty() && user_ids.iter().all(|id| !id.trim().is_empty() && !id.contains("{{"))
        }
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("target")
            .with_message("target must name a segment or at least one resolved user id".into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub provider: MessageProvider,

    #[validate(length(min = 1, message = "templateName is required"))]
    pub template_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[validate(length(min = 2, max = 10, message = "language must be a locale code"))]
    pub language: String,

    #[validate(custom(function = "validate_phone", message = "fromPhone is not a valid phone number"))]
    pub from_phone: String,

    #[validate(custom(function = "validate_phone", message = "toPhone is not a valid phone number"))]
    pub to_phone: String,

    #[validate(length(max = 3, message = "at most three body variables are supported"))]
    pub body_variables: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_variable: Option<String>,
}

/// Rejects values that still carry an unresolved `{{...}}` placeholder
fn validate_resolved(value: &str) -> Result<(), ValidationError> {
    if value.contains("{{") {
        return Err(ValidationError::new("unresolved")
            .with_message(format!("'{}' contains an unresolved placeholder", value).into()));
    }
    Ok(())
}

/// E.164-style number: optional `+` followed by 7 to 15 digits
fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    let valid = (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("phone"))
    }
}
