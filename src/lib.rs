//! PMP Workflow Engine
//!
//! Runs event-triggered marketing workflows:
//! - trigger matching of incoming user events against active workflows
//! - graph traversal with condition branching and `{{source.path}}` data resolution
//! - promo-code, push-notification and WhatsApp/SMS actions
//! - a persisted, per-step execution trace with live execution events

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use api::AppState;
use config::{ProviderConfig, StorageBackend};
use domain::execution::ExecutionStore;
use domain::storage::Storage;
use domain::{MessageGateway, PromoCodeBatch, PushGateway, Workflow};
use infrastructure::action::{
    ActionExecutorRegistry, HttpMessageGateway, HttpPushGateway, MessageExecutor,
    PromoCodeExecutor, ProviderEndpoint, PushNotificationExecutor, SimulatedMessageGateway,
    SimulatedPushGateway, StoragePromoCodeBackend,
};
use infrastructure::execution::{InMemoryExecutionStore, PostgresExecutionStore};
use infrastructure::services::{EventService, WorkflowService};
use infrastructure::storage::{
    PROMO_BATCHES_TABLE, PostgresConfig, StorageFactory, WORKFLOWS_TABLE, run_storage_migrations,
};
use infrastructure::workflow::{ExecutionEventHub, ExecutionOrchestrator, TriggerMatcher};

/// The engine's components, wired together
#[derive(Clone)]
pub struct Engine {
    pub workflows: Arc<dyn Storage<Workflow>>,
    pub promo_batches: Arc<dyn Storage<PromoCodeBatch>>,
    pub execution_store: Arc<dyn ExecutionStore>,
    pub event_hub: Arc<ExecutionEventHub>,
    pub orchestrator: Arc<ExecutionOrchestrator>,
    pub workflow_service: Arc<WorkflowService>,
    pub event_service: Arc<EventService>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Wire the services around the given stores and executors.
    ///
    /// The event hub is created stopped; servers start it explicitly.
    pub fn assemble(
        workflows: Arc<dyn Storage<Workflow>>,
        promo_batches: Arc<dyn Storage<PromoCodeBatch>>,
        execution_store: Arc<dyn ExecutionStore>,
        registry: ActionExecutorRegistry,
        config: &AppConfig,
    ) -> Self {
        let event_hub = Arc::new(ExecutionEventHub::new(config.engine.event_buffer));
        let orchestrator = Arc::new(
            ExecutionOrchestrator::new(execution_store.clone(), Arc::new(registry))
                .with_events(event_hub.clone())
                .with_config(config.engine.orchestrator()),
        );
        let workflow_service = Arc::new(WorkflowService::new(workflows.clone()));
        let event_service = Arc::new(EventService::new(
            TriggerMatcher::new(workflows.clone()),
            orchestrator.clone(),
        ));

        Self {
            workflows,
            promo_batches,
            execution_store,
            event_hub,
            orchestrator,
            workflow_service,
            event_service,
        }
    }

    /// Everything in memory; providers without a base URL are simulated
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::in_memory_with(config, Vec::new(), Vec::new())
    }

    pub fn in_memory_with(
        config: &AppConfig,
        workflows: Vec<Workflow>,
        promo_batches: Vec<PromoCodeBatch>,
    ) -> Self {
        let workflows = StorageFactory::in_memory(workflows);
        let promo_batches = StorageFactory::in_memory(promo_batches);
        let registry = build_action_registry(config, promo_batches.clone());

        Self::assemble(
            workflows,
            promo_batches,
            Arc::new(InMemoryExecutionStore::new()),
            registry,
            config,
        )
    }

    /// Build the engine for the configured storage backend
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                Ok(Self::in_memory(config))
            }
            StorageBackend::Postgres => {
                info!("Connecting to PostgreSQL");
                let pool = PostgresConfig::new(&config.storage.database_url)
                    .with_max_connections(config.storage.max_connections)
                    .connect()
                    .await?;

                if config.storage.run_migrations {
                    run_storage_migrations(&pool).await?;
                    info!("Storage migrations applied");
                }

                let workflows = StorageFactory::postgres(pool.clone(), WORKFLOWS_TABLE);
                let promo_batches = StorageFactory::postgres(pool.clone(), PROMO_BATCHES_TABLE);
                let registry = build_action_registry(config, promo_batches.clone());

                Ok(Self::assemble(
                    workflows,
                    promo_batches,
                    Arc::new(PostgresExecutionStore::new(pool)),
                    registry,
                    config,
                ))
            }
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.workflow_service.clone(),
            self.event_service.clone(),
            self.execution_store.clone(),
            self.event_hub.clone(),
        )
    }
}

/// One executor per action kind, using HTTP providers where configured
pub fn build_action_registry(
    config: &AppConfig,
    promo_batches: Arc<dyn Storage<PromoCodeBatch>>,
) -> ActionExecutorRegistry {
    let engine = &config.engine;
    let providers = &config.providers;

    let push: Arc<dyn PushGateway> = match endpoint(&providers.push, engine) {
        Some(endpoint) => Arc::new(HttpPushGateway::new(endpoint)),
        None => {
            info!("No push provider configured, using simulated gateway");
            Arc::new(SimulatedPushGateway::new())
        }
    };

    let message: Arc<dyn MessageGateway> = match endpoint(&providers.message, engine) {
        Some(endpoint) => Arc::new(HttpMessageGateway::new(endpoint)),
        None => {
            info!("No message provider configured, using simulated gateway");
            Arc::new(SimulatedMessageGateway::new())
        }
    };

    ActionExecutorRegistry::new()
        .with_executor(Arc::new(
            PromoCodeExecutor::new(Arc::new(StoragePromoCodeBackend::new(promo_batches)))
                .with_timeout(engine.action_timeout()),
        ))
        .with_executor(Arc::new(
            PushNotificationExecutor::new(push).with_timeout(providers.push.timeout(engine)),
        ))
        .with_executor(Arc::new(
            MessageExecutor::new(message).with_timeout(providers.message.timeout(engine)),
        ))
}

fn endpoint(
    provider: &ProviderConfig,
    engine: &config::EngineConfig,
) -> Option<ProviderEndpoint> {
    let base_url = provider.base_url.as_ref()?;
    let mut endpoint = ProviderEndpoint::new(base_url).with_timeout(provider.timeout(engine));
    if let Some(token) = &provider.api_token {
        endpoint = endpoint.with_api_token(token);
    }
    Some(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActionKind;

    #[test]
    fn test_registry_covers_every_action_kind() {
        let registry = build_action_registry(
            &AppConfig::default(),
            StorageFactory::in_memory(Vec::new()),
        );

        assert_eq!(
            registry.kinds(),
            vec![
                ActionKind::Message,
                ActionKind::PromoCode,
                ActionKind::PushNotification
            ]
        );
    }

    #[test]
    fn test_in_memory_engine_starts_with_hub_stopped() {
        let engine = Engine::in_memory(&AppConfig::default());
        assert!(!engine.event_hub.is_running());
    }
}
