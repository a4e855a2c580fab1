//! Version resolution across layered sources.
//!
//! Resolution runs in two phases. Unless the caller asked for the latest
//! version or an update, the local cache is consulted first and a hit
//! short-circuits without touching the network. Otherwise every source in
//! the effective set is queried concurrently; a failing or hanging source
//! contributes no candidate and never aborts the others. Per-source results
//! merge commutatively by taking the maximum satisfying version.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use log::{debug, info, warn};
use semver::Version;

use crate::model::PackageRequest;
use crate::source::{PackageSource, VersionFilter};

/// Default upper bound on any single source query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolves a package request to the single version that satisfies it.
#[derive(Debug, Clone)]
pub struct VersionResolver {
    query_timeout: Duration,
}

impl Default for VersionResolver {
    fn default() -> Self {
        Self {
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl VersionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every per-source query; a source that exceeds the bound is
    /// treated like a failed source.
    pub fn with_timeout(query_timeout: Duration) -> Self {
        Self { query_timeout }
    }

    /// Resolve the highest version satisfying the request across `sources`.
    ///
    /// `update` skips the local-first phase, as does `request.get_latest()`;
    /// either way every effective source is consulted. Returns None when no
    /// source has a satisfying version.
    #[tracing::instrument(skip(self, request, sources, local), fields(package = %request.package_id()))]
    pub async fn resolve(
        &self,
        request: &PackageRequest,
        update: bool,
        sources: &[Arc<dyn PackageSource>],
        local: Option<&Arc<dyn PackageSource>>,
    ) -> Option<Version> {
        let filter = request.filter();

        if !update && !request.get_latest() {
            if let Some(local) = local {
                if let Some(version) = self.query_source(local.as_ref(), request, &filter).await {
                    debug!(
                        "Resolved {} to {} from the local cache",
                        request.package_id(),
                        version
                    );
                    return Some(version);
                }
            }
        }

        if sources.is_empty() {
            info!(
                "No sources to query for {}; nothing to resolve",
                request.package_id()
            );
            return None;
        }

        let queries = sources
            .iter()
            .map(|source| self.query_source(source.as_ref(), request, &filter));
        let best = join_all(queries).await.into_iter().flatten().max();

        match &best {
            Some(version) => {
                debug!("Resolved {} to {}", request.package_id(), version);
            }
            None => {
                info!(
                    "No version of {} matching {} found in any source",
                    request.package_id(),
                    request
                        .range()
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "any version".to_string())
                );
            }
        }
        best
    }

    /// Query one source for its best satisfying version.
    ///
    /// Any failure or timeout is logged as a warning and converted to "no
    /// candidate" here, before results are joined.
    async fn query_source(
        &self,
        source: &dyn PackageSource,
        request: &PackageRequest,
        filter: &VersionFilter,
    ) -> Option<Version> {
        let listing = tokio::time::timeout(
            self.query_timeout,
            source.list_versions(request.package_id(), filter),
        )
        .await;

        let versions = match listing {
            Err(_) => {
                warn!(
                    "Source {} timed out after {:?} listing {}; treating as no candidate",
                    source.name(),
                    self.query_timeout,
                    request.package_id()
                );
                return None;
            }
            Ok(Err(e)) => {
                warn!(
                    "Source {} failed listing {}: {:#}; treating as no candidate",
                    source.name(),
                    request.package_id(),
                    e
                );
                return None;
            }
            Ok(Ok(versions)) => versions,
        };

        versions
            .into_iter()
            .map(|candidate| candidate.version)
            .filter(|version| request.range().is_none_or(|range| range.contains(version)))
            .max()
    }
}
