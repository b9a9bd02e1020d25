//! In-process gateways used by the `run` command and the integration tests.
//!
//! They accept every request, remember what they were sent and answer with a
//! plausible provider response. A gateway can be told to fail so failure
//! paths can be exercised without a network.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::domain::action::{
    ActionError, MessageGateway, MessageReceipt, MessageRequest, PushDelivery, PushGateway,
    PushRequest, PushTargetRequest,
};

#[derive(Debug, Default)]
pub struct SimulatedPushGateway {
    sent: Mutex<Vec<PushRequest>>,
    failure: Option<String>,
}

impl SimulatedPushGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway whose every call fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    pub fn sent(&self) -> Vec<PushRequest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PushGateway for SimulatedPushGateway {
    async fn send(&self, request: &PushRequest) -> Result<PushDelivery, ActionError> {
        if let Some(message) = &self.failure {
            return Err(ActionError::external("push", message.clone()));
        }

        info!(title = %request.title, "Simulated push notification");
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request.clone());
        }

        let sent_count = match &request.target {
            PushTargetRequest::Users { user_ids } => user_ids.len() as u64,
            PushTargetRequest::Segment { .. } | PushTargetRequest::All => 1,
        };

        Ok(PushDelivery {
            sent_count,
            failed_count: 0,
            errors: Vec::new(),
        })
    }
}

#[derive(Debug, Default)]
pub struct SimulatedMessageGateway {
    sent: Mutex<Vec<MessageRequest>>,
    failure: Option<String>,
}

impl SimulatedMessageGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway whose every call fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    pub fn sent(&self) -> Vec<MessageRequest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MessageGateway for SimulatedMessageGateway {
    async fn send(&self, request: &MessageRequest) -> Result<MessageReceipt, ActionError> {
        let provider = request.provider.as_str();
        if let Some(message) = &self.failure {
            return Err(ActionError::external(provider, message.clone()));
        }

        info!(
            provider = provider,
            template = %request.template_name,
            to = %request.to_phone,
            "Simulated message"
        );
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request.clone());
        }

        Ok(MessageReceipt {
            message_id: format!("sim-{}", Uuid::new_v4()),
            status: "sent".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_counts_explicit_users() {
        let gateway = SimulatedPushGateway::new();
        let request = PushRequest {
            title: "Hi".to_string(),
            body: "There".to_string(),
            target: PushTargetRequest::Users {
                user_ids: vec!["a".to_string(), "b".to_string()],
            },
            image_url: None,
            deep_link: None,
        };

        let delivery = gateway.send(&request).await.unwrap();

        assert_eq!(delivery.sent_count, 2);
        assert_eq!(gateway.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_push_gateway() {
        let gateway = SimulatedPushGateway::failing("provider unavailable");
        let request = PushRequest {
            title: "Hi".to_string(),
            body: "There".to_string(),
            target: PushTargetRequest::All,
            image_url: None,
            deep_link: None,
        };

        let err = gateway.send(&request).await.unwrap_err();

        assert_eq!(err, ActionError::external("push", "provider unavailable"));
        assert!(gateway.sent().is_empty());
    }
}
