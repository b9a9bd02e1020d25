//! The three action executors.
//!
//! Each one checks that it was handed its own input variant, validates the
//! resolved request, then calls its gateway under a timeout. The gateway's
//! response is returned as the JSON merged into the execution context.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use validator::Validate;

use crate::domain::action::{
    ActionError, ActionExecutor, ActionInput, ActionKind, MessageGateway, PromoCodeBackend,
    PushGateway,
};

pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Await `call`, giving up after `limit`
async fn bounded<T, F>(provider: &str, limit: Duration, call: F) -> Result<T, ActionError>
where
    F: Future<Output = Result<T, ActionError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ActionError::timeout(provider, limit.as_millis() as u64))?
}

fn to_output<T: Serialize>(provider: &str, response: &T) -> Result<Value, ActionError> {
    serde_json::to_value(response)
        .map_err(|e| ActionError::external(provider, format!("Unserializable response: {}", e)))
}

fn unsupported(kind: ActionKind, input: &ActionInput) -> ActionError {
    ActionError::unsupported_input(kind.as_str(), input.type_name())
}

/// Allocates a promo code; output `{code, batchId, batchName, discountType,
/// discountValue, minOrderValue}`
pub struct PromoCodeExecutor {
    backend: Arc<dyn PromoCodeBackend>,
    timeout: Duration,
}

impl PromoCodeExecutor {
    pub fn new(backend: Arc<dyn PromoCodeBackend>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ActionExecutor for PromoCodeExecutor {
    fn kind(&self) -> ActionKind {
        ActionKind::PromoCode
    }

    async fn execute(&self, input: &ActionInput) -> Result<Value, ActionError> {
        let ActionInput::PromoCode(request) = input else {
            return Err(unsupported(self.kind(), input));
        };
        request.validate()?;

        let allocation = bounded("promo_code", self.timeout, self.backend.allocate(request)).await?;
        debug!(code = %allocation.code, "Promo code executor finished");

        to_output("promo_code", &allocation)
    }
}

/// Sends a push notification; output `{sentCount, failedCount, errors}`
pub struct PushNotificationExecutor {
    gateway: Arc<dyn PushGateway>,
    timeout: Duration,
}

impl PushNotificationExecutor {
    pub fn new(gateway: Arc<dyn PushGateway>) -> Self {
        Self {
            gateway,
            timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ActionExecutor for PushNotificationExecutor {
    fn kind(&self) -> ActionKind {
        ActionKind::PushNotification
    }

    async fn execute(&self, input: &ActionInput) -> Result<Value, ActionError> {
        let ActionInput::PushNotification(request) = input else {
            return Err(unsupported(self.kind(), input));
        };
        request.validate()?;

        let delivery = bounded("push", self.timeout, self.gateway.send(request)).await?;
        to_output("push", &delivery)
    }
}

/// Sends a WhatsApp/SMS template message; output `{messageId, status}`
pub struct MessageExecutor {
    gateway: Arc<dyn MessageGateway>,
    timeout: Duration,
}

impl MessageExecutor {
    pub fn new(gateway: Arc<dyn MessageGateway>) -> Self {
        Self {
            gateway,
            timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ActionExecutor for MessageExecutor {
    fn kind(&self) -> ActionKind {
        ActionKind::Message
    }

    async fn execute(&self, input: &ActionInput) -> Result<Value, ActionError> {
        let ActionInput::Message(request) = input else {
            return Err(unsupported(self.kind(), input));
        };
        request.validate()?;

        let provider = request.provider.as_str();
        let receipt = bounded(provider, self.timeout, self.gateway.send(request)).await?;
        to_output(provider, &receipt)
    }
}
