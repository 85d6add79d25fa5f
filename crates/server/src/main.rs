mod bootstrap;
mod feed;
mod health;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use concierge_core::config::{AppConfig, LoadOptions};
use concierge_desk::Orchestrator;

fn init_logging(config: &AppConfig) {
    use concierge_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let desk = Arc::new(app.desk);
    spawn_session_sweeper(desk.clone(), app.config.workflow.session_idle_ttl_minutes);

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        capabilities = desk.router().registered().len(),
        "concierge-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "concierge-server stopping"
    );

    Ok(())
}

/// Periodic explicit eviction of idle session contexts. Sessions are never
/// dropped mid-call; this sweep is the only cleanup path.
fn spawn_session_sweeper(desk: Arc<Orchestrator>, idle_ttl_minutes: u32) {
    let sweep_secs = u64::from(idle_ttl_minutes.max(4)) * 60 / 4;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(sweep_secs));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match desk.evict_idle_sessions().await {
                Ok(evicted) if evicted.is_empty() => {}
                Ok(evicted) => {
                    tracing::info!(
                        event_name = "system.session.evicted",
                        correlation_id = "session-sweeper",
                        evicted = evicted.len(),
                        "idle session contexts evicted"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        event_name = "system.session.sweep_failed",
                        correlation_id = "session-sweeper",
                        error = %error,
                        "session eviction sweep failed"
                    );
                }
            }
        }
    });
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
