//! Runtime settings: remote source list, cache root, query timeout.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::Deserialize;

use crate::http::HttpClient;
use crate::source::{HttpRegistrySource, PackageSource};

const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// One configured remote registry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RemoteSourceConfig {
    pub name: String,
    pub url: String,
}

/// Deserialized application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub remote_sources: Vec<RemoteSourceConfig>,
    #[serde(default)]
    pub cache_root: Option<PathBuf>,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_query_timeout_secs() -> u64 {
    DEFAULT_QUERY_TIMEOUT_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote_sources: Vec::new(),
            cache_root: None,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Root directory of the local package store.
    ///
    /// Resolution order: `PAKR_ROOT` environment variable, then the
    /// configured `cache_root`, then `~/.pakr`.
    pub fn effective_cache_root(&self) -> Result<PathBuf> {
        if let Ok(root) = env::var("PAKR_ROOT") {
            return Ok(PathBuf::from(root));
        }
        if let Some(root) = &self.cache_root {
            return Ok(root.clone());
        }
        let home = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home.join(".pakr"))
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Builds the shared HTTP client, authenticating with `PAKR_TOKEN`
    /// when it is set.
    pub fn http_client(&self) -> Result<Client> {
        let mut headers = HeaderMap::new();
        if let Ok(token) = env::var("PAKR_TOKEN") {
            let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            auth_value.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_value);
            debug!("Using PAKR_TOKEN for authentication");
        }

        let client = Client::builder()
            .user_agent("pakr")
            .default_headers(headers)
            .build()?;
        Ok(client)
    }

    /// Instantiates the configured remote registries.
    pub fn build_sources(&self) -> Result<Vec<Arc<dyn PackageSource>>> {
        let client = HttpClient::new(self.http_client()?);
        Ok(self
            .remote_sources
            .iter()
            .map(|source| {
                Arc::new(HttpRegistrySource::new(
                    &source.name,
                    &source.url,
                    client.clone(),
                )) as Arc<dyn PackageSource>
            })
            .collect())
    }
}
