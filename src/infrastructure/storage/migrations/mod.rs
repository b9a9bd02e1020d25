//! Database migrations infrastructure

use sqlx::postgres::PgPool;

use crate::domain::DomainError;

use super::factory::{PROMO_BATCHES_TABLE, WORKFLOWS_TABLE};

/// Applies versioned SQL migrations, tracked in `_migrations`
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                success BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    /// Runs a single migration
    pub async fn run_migration(&self, migration: &Migration) -> Result<(), DomainError> {
        self.ensure_migrations_table().await?;

        // Check if already applied
        let applied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)",
        )
        .bind(migration.version)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to check migration status: {}", e)))?;

        if applied {
            return Ok(());
        }

        // Run the migration
        sqlx::raw_sql(&migration.up)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        // Record the migration
        sqlx::query(
            "INSERT INTO _migrations (version, description) VALUES ($1, $2)",
        )
        .bind(migration.version)
        .bind(&migration.description)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::storage(format!("Failed to record migration {}: {}", migration.version, e))
        })?;

        Ok(())
    }

    /// Returns the latest applied migration version
    pub async fn current_version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        let version: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(version) FROM _migrations WHERE success = TRUE",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get migration version: {}", e)))?;

        Ok(version)
    }
}

/// Represents a database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version (timestamp-based recommended)
    pub version: i64,
    /// Human-readable description
    pub description: String,
    /// SQL to run when applying the migration
    pub up: String,
    /// SQL that undoes the migration, kept for manual rollbacks
    pub down: String,
}

impl Migration {
    pub fn new(
        version: i64,
        description: impl Into<String>,
        up: impl Into<String>,
        down: impl Into<String>,
    ) -> Self {
        Self {
            version,
            description: description.into(),
            up: up.into(),
            down: down.into(),
        }
    }
}

fn document_table(name: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {name} (
            key VARCHAR(255) PRIMARY KEY,
            data JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        CREATE INDEX IF NOT EXISTS idx_{name}_created_at ON {name}(created_at);
        "#
    )
}

/// Collection of migrations for the engine's tables
pub fn storage_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create workflows table",
            document_table(WORKFLOWS_TABLE),
            "DROP TABLE IF EXISTS workflows;",
        ),
        Migration::new(
            2,
            "Create promo_batches table",
            document_table(PROMO_BATCHES_TABLE),
            "DROP TABLE IF EXISTS promo_batches;",
        ),
        Migration::new(
            3,
            "Create workflow_executions table",
            r#"
            CREATE TABLE IF NOT EXISTS workflow_executions (
                id UUID PRIMARY KEY,
                workflow_id VARCHAR(64) NOT NULL,
                status VARCHAR(16) NOT NULL,
                trigger_event JSONB NOT NULL,
                metrics JSONB,
                error_summary TEXT,
                result JSONB,
                cancel_requested BOOLEAN NOT NULL DEFAULT FALSE,
                started_at TIMESTAMPTZ NOT NULL,
                completed_at TIMESTAMPTZ
            );
            CREATE INDEX IF NOT EXISTS idx_workflow_executions_workflow
                ON workflow_executions(workflow_id, started_at DESC);
            CREATE INDEX IF NOT EXISTS idx_workflow_executions_completed
                ON workflow_executions(workflow_id, status, completed_at DESC);
            "#,
            "DROP TABLE IF EXISTS workflow_executions;",
        ),
        Migration::new(
            4,
            "Create workflow_steps table",
            r#"
            CREATE TABLE IF NOT EXISTS workflow_steps (
                id UUID PRIMARY KEY,
                execution_id UUID NOT NULL REFERENCES workflow_executions(id) ON DELETE CASCADE,
                step_order INTEGER NOT NULL,
                step_type VARCHAR(32) NOT NULL,
                node_id VARCHAR(255),
                node_type VARCHAR(32),
                status VARCHAR(16) NOT NULL,
                started_at TIMESTAMPTZ,
                ended_at TIMESTAMPTZ,
                duration_ms BIGINT,
                input JSONB,
                output JSONB,
                error TEXT,
                UNIQUE (execution_id, step_order)
            );
            "#,
            "DROP TABLE IF EXISTS workflow_steps;",
        ),
    ]
}

/// Runs all pending storage migrations
pub async fn run_storage_migrations(pool: &PgPool) -> Result<(), DomainError> {
    let migrator = PostgresMigrator::new(pool.clone());
    let migrations = storage_migrations();

    for migration in migrations {
        migrator.run_migration(&migration).await?;
    }

    Ok(())
}
