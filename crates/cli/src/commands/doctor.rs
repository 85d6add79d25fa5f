use concierge_core::config::{AppConfig, LoadOptions};
use concierge_db::connect_with_settings;
use secrecy::ExposeSecret;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('"', "\\\"")
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_directory_credentials(&config));
            checks.push(check_catalog_source(&config));
            checks.push(check_database_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["directory_credentials", "catalog_source", "database_connectivity"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_directory_credentials(config: &AppConfig) -> DoctorCheck {
    if !config.directory.enabled {
        return DoctorCheck {
            name: "directory_credentials",
            status: CheckStatus::Pass,
            details: "directory integration disabled; running against in-process directory"
                .to_string(),
        };
    }

    let token_present = config
        .directory
        .api_token
        .as_ref()
        .map(|token| !token.expose_secret().trim().is_empty())
        .unwrap_or(false);
    if token_present {
        DoctorCheck {
            name: "directory_credentials",
            status: CheckStatus::Pass,
            details: "directory api token present".to_string(),
        }
    } else {
        DoctorCheck {
            name: "directory_credentials",
            status: CheckStatus::Fail,
            details: "directory.enabled is true but no api token is configured".to_string(),
        }
    }
}

fn check_catalog_source(config: &AppConfig) -> DoctorCheck {
    match (&config.catalog.feed_path, &config.catalog.feed_url) {
        (Some(path), _) if !path.exists() => DoctorCheck {
            name: "catalog_source",
            status: CheckStatus::Fail,
            details: format!("catalog feed file not found: {}", path.display()),
        },
        (Some(path), _) => DoctorCheck {
            name: "catalog_source",
            status: CheckStatus::Pass,
            details: format!("catalog feed file present: {}", path.display()),
        },
        (None, Some(url)) => DoctorCheck {
            name: "catalog_source",
            status: CheckStatus::Pass,
            details: format!("catalog feed url configured: {url}"),
        },
        (None, None) => DoctorCheck {
            name: "catalog_source",
            status: CheckStatus::Pass,
            details: "no feed configured; the built-in demo catalog will be used".to_string(),
        },
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let outcome = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| error.to_string())?;
        pool.close().await;
        Ok::<(), String>(())
    });

    match outcome {
        Ok(()) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: "database reachable".to_string(),
        },
        Err(error) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Fail,
            details: error,
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("  [{marker}] {}: {}", check.name, check.details));
    }
    lines.join("\n")
}
