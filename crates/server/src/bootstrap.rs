use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use concierge_core::audit::{AuditEvent, AuditSink};
use concierge_core::config::{AppConfig, ConfigError, LoadOptions};
use concierge_db::{connect_with_settings, migrations, DbPool};
use concierge_desk::service::WorkflowSettings;
use concierge_desk::{in_memory_desk, DeskOptions, Orchestrator};

use crate::feed::{load_catalog, FeedError};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub desk: Orchestrator,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("catalog feed failed: {0}")]
    CatalogFeed(#[from] FeedError),
}

/// Forwards every audit event into the structured log stream.
struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        info!(
            event_name = %event.event_type,
            correlation_id = %event.correlation_id,
            request_id = event.request_id.as_ref().map(|id| id.0.as_str()).unwrap_or("unknown"),
            session = event.session.as_deref().unwrap_or("unknown"),
            actor = %event.actor,
            outcome = ?event.outcome,
            "audit event"
        );
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let snapshot = load_catalog(&config.catalog).await?;
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        correlation_id = "bootstrap",
        entries = snapshot.entries.len(),
        rosters = snapshot.rosters.len(),
        "catalog snapshot loaded"
    );

    let desk = in_memory_desk(DeskOptions {
        rosters: snapshot.rosters_as_pairs(),
        catalog: snapshot.entries,
        audit: Some(Arc::new(TracingAuditSink)),
        settings: WorkflowSettings {
            review_after_days: config.workflow.review_after_days,
            request_expiry_days: config.workflow.request_expiry_days,
        },
        session_idle_ttl_minutes: config.workflow.session_idle_ttl_minutes,
    });

    Ok(Application { config, db_pool, desk })
}
