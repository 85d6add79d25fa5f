//! Catalog feed loading. The catalog is a read-only snapshot taken once at
//! startup, from a JSON file or an HTTP endpoint; environments without a
//! configured feed run on the built-in demo snapshot. There is no hot
//! reload.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use concierge_core::config::CatalogConfig;
use concierge_core::domain::catalog::CatalogEntry;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub group: String,
    pub members: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub entries: Vec<CatalogEntry>,
    #[serde(default)]
    pub rosters: Vec<RosterEntry>,
}

impl CatalogSnapshot {
    pub fn rosters_as_pairs(&self) -> Vec<(String, Vec<String>)> {
        self.rosters.iter().map(|roster| (roster.group.clone(), roster.members.clone())).collect()
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("could not read catalog feed `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog feed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("could not fetch catalog feed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("catalog feed contained no entries")]
    Empty,
}

pub async fn load_catalog(config: &CatalogConfig) -> Result<CatalogSnapshot, FeedError> {
    let snapshot = if let Some(path) = &config.feed_path {
        load_from_file(path).await?
    } else if let Some(url) = &config.feed_url {
        load_from_url(url).await?
    } else {
        builtin_snapshot()
    };

    if snapshot.entries.is_empty() {
        return Err(FeedError::Empty);
    }
    Ok(snapshot)
}

async fn load_from_file(path: &Path) -> Result<CatalogSnapshot, FeedError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FeedError::Read { path: path.to_path_buf(), source })?;
    Ok(serde_json::from_str(&raw)?)
}

async fn load_from_url(url: &str) -> Result<CatalogSnapshot, FeedError> {
    let response = reqwest::get(url).await?.error_for_status()?;
    Ok(response.json().await?)
}

fn builtin_snapshot() -> CatalogSnapshot {
    CatalogSnapshot {
        entries: concierge_db::demo_catalog(),
        rosters: concierge_db::demo_rosters()
            .into_iter()
            .map(|(group, members)| RosterEntry { group, members })
            .collect(),
    }
}
