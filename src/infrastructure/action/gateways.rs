//! HTTP gateways to the push and messaging providers

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::domain::action::{
    ActionError, MessageGateway, MessageReceipt, MessageRequest, PushDelivery, PushGateway,
    PushRequest,
};

use super::http_client::{HttpClient, HttpClientTrait, HttpError};

/// Where a provider lives and how to authenticate against it
#[derive(Debug, Clone)]
pub struct ProviderEndpoint {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl ProviderEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Vec<(String, String)> {
        self.api_token
            .iter()
            .map(|token| ("Authorization".to_string(), format!("Bearer {}", token)))
            .collect()
    }

    async fn call<Req, Resp>(
        &self,
        client: &dyn HttpClientTrait,
        provider: &str,
        path: &str,
        request: &Req,
    ) -> Result<Resp, ActionError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let body = serde_json::to_value(request)
            .map_err(|e| ActionError::validation(format!("Unserializable request: {}", e)))?;
        let url = self.url(path);

        debug!(provider = provider, url = %url, "Calling provider");

        let response = client
            .post_json(&url, self.headers(), &body)
            .await
            .map_err(|e| match e {
                HttpError::Timeout => {
                    ActionError::timeout(provider, self.timeout.as_millis() as u64)
                }
                other => ActionError::external(provider, other.to_string()),
            })?;

        serde_json::from_value(response).map_err(|e| {
            ActionError::external(provider, format!("Unexpected response shape: {}", e))
        })
    }
}

/// Sends push notifications through `POST {base}/v1/push`
pub struct HttpPushGateway {
    client: Arc<dyn HttpClientTrait>,
    endpoint: ProviderEndpoint,
}

impl std::fmt::Debug for HttpPushGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPushGateway")
            .field("endpoint", &self.endpoint.base_url)
            .finish()
    }
}

impl HttpPushGateway {
    pub fn new(endpoint: ProviderEndpoint) -> Self {
        let client = Arc::new(HttpClient::with_timeout(endpoint.timeout));
        Self::with_client(endpoint, client)
    }

    pub fn with_client(endpoint: ProviderEndpoint, client: Arc<dyn HttpClientTrait>) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn send(&self, request: &PushRequest) -> Result<PushDelivery, ActionError> {
        self.endpoint
            .call(self.client.as_ref(), "push", "/v1/push", request)
            .await
    }
}

/// Sends templated WhatsApp/SMS messages through
/// `POST {base}/v1/messages/{provider}`
pub struct HttpMessageGateway {
    client: Arc<dyn HttpClientTrait>,
    endpoint: ProviderEndpoint,
}

impl std::fmt::Debug for HttpMessageGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMessageGateway")
            .field("endpoint", &self.endpoint.base_url)
            .finish()
    }
}

impl HttpMessageGateway {
    pub fn new(endpoint: ProviderEndpoint) -> Self {
        let client = Arc::new(HttpClient::with_timeout(endpoint.timeout));
        Self::with_client(endpoint, client)
    }

    pub fn with_client(endpoint: ProviderEndpoint, client: Arc<dyn HttpClientTrait>) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl MessageGateway for HttpMessageGateway {
    async fn send(&self, request: &MessageRequest) -> Result<MessageReceipt, ActionError> {
        let provider = request.provider.as_str();
        let path = format!("/v1/messages/{}", provider);

        self.endpoint
            .call(self.client.as_ref(), provider, &path, request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::PushTargetRequest;
    use crate::domain::workflow::MessageProvider;
    use crate::infrastructure::action::http_client::MockHttpClientTrait;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn push_request() -> PushRequest {
        PushRequest {
            title: "Your cart misses you".to_string(),
            body: "Use SAVE10".to_string(),
            target: PushTargetRequest::Users {
                user_ids: vec!["u-1".to_string()],
            },
            image_url: None,
            deep_link: None,
        }
    }

    fn message_request() -> MessageRequest {
        MessageRequest {
            provider: MessageProvider::Whatsapp,
            template_name: "cart_reminder".to_string(),
            namespace: Some("shop".to_string()),
            language: "en".to_string(),
            from_phone: "+15550000".to_string(),
            to_phone: "+15550100".to_string(),
            body_variables: vec!["SAVE10".to_string()],
            button_variable: None,
        }
    }

    #[tokio::test]
    async fn test_push_gateway_posts_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/push"))
            .and(header("Authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sentCount": 1,
                "failedCount": 0,
                "errors": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = HttpPushGateway::new(ProviderEndpoint::new(server.uri()).with_api_token("token-1"));
        let delivery = gateway.send(&push_request()).await.unwrap();

        assert_eq!(delivery.sent_count, 1);
        assert!(delivery.errors.is_empty());
    }

    #[tokio::test]
    async fn test_message_gateway_uses_provider_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages/whatsapp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messageId": "wamid.1",
                "status": "sent"
            })))
            .mount(&server)
            .await;

        let gateway = HttpMessageGateway::new(ProviderEndpoint::new(format!("{}/", server.uri())));
        let receipt = gateway.send(&message_request()).await.unwrap();

        assert_eq!(receipt.message_id, "wamid.1");
        assert_eq!(receipt.status, "sent");
    }

    #[tokio::test]
    async fn test_provider_error_becomes_external_call_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let gateway = HttpMessageGateway::new(ProviderEndpoint::new(server.uri()));
        let err = gateway.send(&message_request()).await.unwrap_err();

        assert_eq!(err, ActionError::external("whatsapp", "HTTP 500: boom"));
    }

    #[tokio::test]
    async fn test_timeout_is_reported_with_budget() {
        let mut client = MockHttpClientTrait::new();
        client
            .expect_post_json()
            .returning(|_, _, _| Err(HttpError::Timeout));

        let endpoint = ProviderEndpoint::new("http://push.local").with_timeout(Duration::from_millis(250));
        let gateway = HttpPushGateway::with_client(endpoint, Arc::new(client));
        let err = gateway.send(&push_request()).await.unwrap_err();

        assert_eq!(err, ActionError::timeout("push", 250));
    }

    #[tokio::test]
    async fn test_unexpected_response_shape() {
        let mut client = MockHttpClientTrait::new();
        client
            .expect_post_json()
            .returning(|_, _, _| Ok(json!({"unexpected": true})));

        let gateway = HttpMessageGateway::with_client(
            ProviderEndpoint::new("http://sms.local"),
            Arc::new(client),
        );
        let err = gateway.send(&message_request()).await.unwrap_err();

        assert!(matches!(err, ActionError::ExternalCall { .. }));
    }
}
