//! Ports to the external services behind each executor

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use super::error::ActionError;
use super::input::{MessageRequest, PromoCodeRequest, PushRequest};

/// A promo code handed out from a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoAllocation {
    pub code: String,
    pub batch_id: String,
    pub batch_name: String,
    pub discount_type: String,
    pub discount_value: f64,
    pub min_order_value: Option<f64>,
}

/// Outcome reported by the push provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushDelivery {
    pub sent_count: u64,
    pub failed_count: u64,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Acknowledgement from a messaging provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceipt {
    pub message_id: String,
    pub status: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PromoCodeBackend: Send + Sync {
    async fn allocate(&self, request: &PromoCodeRequest) -> Result<PromoAllocation, ActionError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, request: &PushRequest) -> Result<PushDelivery, ActionError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send(&self, request: &MessageRequest) -> Result<MessageReceipt, ActionError>;
}
