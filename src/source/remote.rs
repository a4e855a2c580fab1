//! Remote registry source over a JSON version index.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use super::{Dependency, PackageSource, PackageVersion, VersionFilter};
use crate::http::HttpClient;
use crate::model::parse_version;

/// One version entry as served by the registry.
#[derive(Debug, Deserialize)]
struct RegistryEntry {
    /// May be null for tombstoned entries; those contribute nothing.
    version: Option<String>,
    #[serde(default = "default_listed")]
    listed: bool,
    #[serde(default)]
    dependencies: Vec<Dependency>,
}

fn default_listed() -> bool {
    true
}

/// A remote package registry queried over HTTP.
///
/// Version index endpoint: `GET {base}/packages/{id}/versions`, optionally
/// with a `target` query parameter, returning a JSON array of
/// `{"version", "listed", "dependencies"}` entries.
pub struct HttpRegistrySource {
    name: String,
    base_url: String,
    client: HttpClient,
}

impl HttpRegistrySource {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, client: HttpClient) -> Self {
        let base_url = base_url.into();
        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn versions_url(&self, package_id: &str) -> String {
        format!("{}/packages/{}/versions", self.base_url, package_id)
    }
}

#[async_trait]
impl PackageSource for HttpRegistrySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &str {
        &self.base_url
    }

    #[tracing::instrument(skip(self, filter), fields(source = %self.name))]
    async fn list_versions(
        &self,
        package_id: &str,
        filter: &VersionFilter,
    ) -> Result<Vec<PackageVersion>> {
        let url = self.versions_url(package_id);
        debug!("Listing versions of {} from {}...", package_id, url);

        let entries: Vec<RegistryEntry> = match &filter.target {
            Some(target) => {
                self.client
                    .get_json_with_query(&url, &[("target", target)])
                    .await
            }
            None => self.client.get_json(&url).await,
        }
        .with_context(|| format!("Failed to list versions of {} from {}", package_id, self.name))?;

        let candidates = entries
            .into_iter()
            .filter_map(|entry| {
                let raw = entry.version?;
                let Some(version) = parse_version(&raw) else {
                    debug!(
                        "Skipping unparsable version {:?} of {} from {}",
                        raw, package_id, self.name
                    );
                    return None;
                };
                Some(PackageVersion {
                    version,
                    listed: entry.listed,
                    dependencies: entry.dependencies,
                })
            })
            .filter(|candidate| filter.admits(candidate))
            .collect();

        Ok(candidates)
    }
}
