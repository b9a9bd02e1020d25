//! Action executor trait

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

use super::error::ActionError;
use super::input::ActionInput;

/// Kinds of side-effecting actions, one executor each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    PromoCode,
    PushNotification,
    Message,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PromoCode => "promo_code",
            Self::PushNotification => "push_notification",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A narrow adapter performing one kind of action.
///
/// Implementations validate their input before calling out, bound their own
/// external call with a timeout and report every failure as an
/// [`ActionError`] so the caller can record a clean step outcome.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    fn kind(&self) -> ActionKind;

    /// Run the action; the returned JSON is merged into the execution context
    async fn execute(&self, input: &ActionInput) -> Result<Value, ActionError>;
}
