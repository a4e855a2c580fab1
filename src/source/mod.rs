//! Source abstraction for package repositories.
//!
//! A source is a queryable registry of package versions: the local on-disk
//! cache or a remote network registry. Sources are read-only, shareable
//! handles; all of them answer the same question, "which versions of this
//! package do you know, under this inclusion policy".

mod local;
mod remote;
mod select;

use anyhow::Result;
use async_trait::async_trait;
use semver::Version;
use serde::{Deserialize, Serialize};

pub use local::LocalStore;
pub use remote::HttpRegistrySource;
pub use select::effective_sources;

/// A transitive dependency declared by one package version.
///
/// Carried opaque through resolution; only the delegated installer walks
/// dependency graphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,
    #[serde(default)]
    pub range: Option<String>,
}

/// One candidate version reported by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    pub version: Version,
    /// Unlisted versions are hidden from resolution unless explicitly allowed.
    pub listed: bool,
    pub dependencies: Vec<Dependency>,
}

impl PackageVersion {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            listed: true,
            dependencies: Vec::new(),
        }
    }

    pub fn unlisted(version: Version) -> Self {
        Self {
            listed: false,
            ..Self::new(version)
        }
    }
}

/// Inclusion filter passed through to every per-source query.
///
/// The resolver does not apply these itself; each source excludes
/// prerelease/unlisted candidates according to the flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionFilter {
    pub allow_prerelease: bool,
    pub allow_unlisted: bool,
    /// Platform/framework moniker forwarded to registries that index by it.
    pub target: Option<String>,
}

impl VersionFilter {
    /// Whether a candidate passes this filter.
    pub fn admits(&self, candidate: &PackageVersion) -> bool {
        if !self.allow_prerelease && !candidate.version.pre.is_empty() {
            return false;
        }
        if !self.allow_unlisted && !candidate.listed {
            return false;
        }
        true
    }
}

/// Trait for package version sources (local cache, remote registries).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// Human-readable source name, used in logs.
    fn name(&self) -> &str;

    /// Stable location key (URL or path); exact duplicates are deduplicated
    /// on this when building the effective source set.
    fn location(&self) -> &str;

    /// List the known versions of a package that pass the filter.
    ///
    /// Failures here (network, parse, missing resource) are per-source
    /// failures; the resolver degrades them to "no candidate".
    async fn list_versions(
        &self,
        package_id: &str,
        filter: &VersionFilter,
    ) -> Result<Vec<PackageVersion>>;
}
