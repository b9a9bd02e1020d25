use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::action::DEFAULT_ACTION_TIMEOUT;
use crate::infrastructure::workflow::{DEFAULT_EVENT_CAPACITY, OrchestratorConfig};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageSettings,
    pub engine: EngineConfig,
    pub providers: ProvidersConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to call the API from a browser
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub database_url: String,
    pub max_connections: u32,
    /// Apply pending migrations on startup
    pub run_migrations: bool,
}

/// Orchestrator tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_action_timeout_ms: u64,
    pub execution_deadline_ms: Option<u64>,
    pub history_lookup: bool,
    pub event_buffer: usize,
}

/// Endpoint of one external provider; unset `base_url` means simulated
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub push: ProviderConfig,
    pub message: ProviderConfig,
}

/// Prometheus exporter; the scrape endpoint is mounted at `path`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: "postgres://localhost/pmp_workflow_engine".to_string(),
            max_connections: 10,
            run_migrations: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_action_timeout_ms: DEFAULT_ACTION_TIMEOUT.as_millis() as u64,
            execution_deadline_ms: None,
            history_lookup: true,
            event_buffer: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.default_action_timeout_ms)
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        let config = OrchestratorConfig::default().with_history_lookup(self.history_lookup);
        match self.execution_deadline_ms {
            Some(ms) => config.with_deadline(Duration::from_millis(ms)),
            None => config,
        }
    }
}

impl ProviderConfig {
    /// Per-provider timeout, falling back to the engine default
    pub fn timeout(&self, engine: &EngineConfig) -> Duration {
        self.timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| engine.action_timeout())
    }
}

impl AppConfig {
    /// Layer `config/default`, `config/local` and `APP__SECTION__KEY`
    /// environment variables; a `.env` file is loaded first if present
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_run_without_configuration() {
        let config = AppConfig::default();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.engine.history_lookup);
        assert!(config.engine.execution_deadline_ms.is_none());
        assert!(config.providers.push.base_url.is_none());
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.path, "/metrics");
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig = config::Config::builder()
            .set_override("engine.execution_deadline_ms", 5000)
            .unwrap()
            .set_override("logging.format", "json")
            .unwrap()
            .set_override("providers.push.base_url", "http://push.local")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.engine.orchestrator().execution_deadline,
            Some(Duration::from_millis(5000))
        );
        assert_eq!(config.providers.push.base_url.as_deref(), Some("http://push.local"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_provider_timeout_falls_back_to_engine_default() {
        let engine = EngineConfig {
            default_action_timeout_ms: 1500,
            ..EngineConfig::default()
        };
        let provider = ProviderConfig::default();
        assert_eq!(provider.timeout(&engine), Duration::from_millis(1500));

        let provider = ProviderConfig {
            timeout_ms: Some(200),
            ..ProviderConfig::default()
        };
        assert_eq!(provider.timeout(&engine), Duration::from_millis(200));
    }
}
