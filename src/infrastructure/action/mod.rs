//! Action infrastructure - executors, provider gateways and the registry

mod executors;
mod gateways;
pub mod http_client;
mod promo_backend;
mod registry;
mod simulated;

pub use executors::{
    DEFAULT_ACTION_TIMEOUT, MessageExecutor, PromoCodeExecutor, PushNotificationExecutor,
};
pub use gateways::{HttpMessageGateway, HttpPushGateway, ProviderEndpoint};
pub use http_client::{HttpClient, HttpClientTrait, HttpError};
pub use promo_backend::StoragePromoCodeBackend;
pub use registry::ActionExecutorRegistry;
pub use simulated::{SimulatedMessageGateway, SimulatedPushGateway};
