use concierge_core::config::{AppConfig, LoadOptions, LogFormat};
use secrecy::ExposeSecret;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct EffectiveConfig {
    database: DatabaseView,
    server: ServerView,
    directory: DirectoryView,
    workflow: WorkflowView,
    catalog: CatalogView,
    logging: LoggingView,
}

#[derive(Debug, Serialize)]
struct DatabaseView {
    url: String,
    max_connections: u32,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct ServerView {
    bind_address: String,
    health_check_port: u16,
    graceful_shutdown_secs: u64,
}

#[derive(Debug, Serialize)]
struct DirectoryView {
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct WorkflowView {
    review_after_days: u32,
    request_expiry_days: u32,
    session_idle_ttl_minutes: u32,
}

#[derive(Debug, Serialize)]
struct CatalogView {
    #[serde(skip_serializing_if = "Option::is_none")]
    feed_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feed_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoggingView {
    level: String,
    format: &'static str,
}

/// Effective configuration after the full precedence chain
/// (overrides > env > file > defaults), secrets redacted, rendered as TOML.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let view = EffectiveConfig {
        database: DatabaseView {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            timeout_secs: config.database.timeout_secs,
        },
        server: ServerView {
            bind_address: config.server.bind_address.clone(),
            health_check_port: config.server.health_check_port,
            graceful_shutdown_secs: config.server.graceful_shutdown_secs,
        },
        directory: DirectoryView {
            enabled: config.directory.enabled,
            base_url: config.directory.base_url.clone(),
            api_token: config
                .directory
                .api_token
                .as_ref()
                .map(|token| redact(token.expose_secret())),
        },
        workflow: WorkflowView {
            review_after_days: config.workflow.review_after_days,
            request_expiry_days: config.workflow.request_expiry_days,
            session_idle_ttl_minutes: config.workflow.session_idle_ttl_minutes,
        },
        catalog: CatalogView {
            feed_path: config
                .catalog
                .feed_path
                .as_ref()
                .map(|path| path.display().to_string()),
            feed_url: config.catalog.feed_url.clone(),
        },
        logging: LoggingView {
            level: config.logging.level.clone(),
            format: match config.logging.format {
                LogFormat::Compact => "compact",
                LogFormat::Pretty => "pretty",
                LogFormat::Json => "json",
            },
        },
    };

    match toml::to_string(&view) {
        Ok(rendered) => format!(
            "# effective config (precedence: overrides > env > file > defaults)\n{rendered}"
        ),
        Err(error) => format!("config rendering failed: {error}"),
    }
}

fn redact(token: &str) -> String {
    if token.len() <= 4 {
        return "****".to_string();
    }
    format!("{}****", &token[..4])
}
