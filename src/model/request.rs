//! Package request construction and validation.

use std::fmt;
use std::sync::Arc;

use crate::model::range::VersionRange;
use crate::source::{PackageSource, VersionFilter};

/// Errors rejected synchronously at request construction, before any I/O.
#[derive(Debug)]
pub enum RequestError {
    /// The package id was empty or whitespace-only.
    EmptyPackageId,
    /// Both a version range and get-latest were requested.
    RangeConflictsWithLatest(String),
    /// The version range string did not parse.
    InvalidRange { input: String, reason: String },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::EmptyPackageId => {
                write!(f, "Package id must not be empty")
            }
            RequestError::RangeConflictsWithLatest(id) => {
                write!(
                    f,
                    "Request for {:?} asks for the latest version and a version range; pick one",
                    id
                )
            }
            RequestError::InvalidRange { input, reason } => {
                write!(f, "Invalid version range {:?}: {}", input, reason)
            }
        }
    }
}

impl std::error::Error for RequestError {}

/// An immutable request to resolve and install one package.
#[derive(Clone)]
pub struct PackageRequest {
    package_id: String,
    range: Option<VersionRange>,
    get_latest: bool,
    allow_prerelease: bool,
    allow_unlisted: bool,
    exclusive_sources: bool,
    explicit_sources: Vec<Arc<dyn PackageSource>>,
    target: Option<String>,
}

impl PackageRequest {
    pub fn builder(package_id: impl Into<String>) -> PackageRequestBuilder {
        PackageRequestBuilder {
            package_id: package_id.into(),
            range: None,
            get_latest: false,
            allow_prerelease: false,
            allow_unlisted: false,
            exclusive_sources: false,
            explicit_sources: Vec::new(),
            target: None,
        }
    }

    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    pub fn range(&self) -> Option<&VersionRange> {
        self.range.as_ref()
    }

    pub fn get_latest(&self) -> bool {
        self.get_latest
    }

    pub fn allow_prerelease(&self) -> bool {
        self.allow_prerelease
    }

    pub fn allow_unlisted(&self) -> bool {
        self.allow_unlisted
    }

    pub fn exclusive_sources(&self) -> bool {
        self.exclusive_sources
    }

    pub fn explicit_sources(&self) -> &[Arc<dyn PackageSource>] {
        &self.explicit_sources
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// The pass-through inclusion filter handed to every per-source query.
    pub fn filter(&self) -> VersionFilter {
        VersionFilter {
            allow_prerelease: self.allow_prerelease,
            allow_unlisted: self.allow_unlisted,
            target: self.target.clone(),
        }
    }
}

impl fmt::Debug for PackageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageRequest")
            .field("package_id", &self.package_id)
            .field("range", &self.range)
            .field("get_latest", &self.get_latest)
            .field("allow_prerelease", &self.allow_prerelease)
            .field("allow_unlisted", &self.allow_unlisted)
            .field("exclusive_sources", &self.exclusive_sources)
            .field(
                "explicit_sources",
                &self
                    .explicit_sources
                    .iter()
                    .map(|s| s.name().to_string())
                    .collect::<Vec<_>>(),
            )
            .field("target", &self.target)
            .finish()
    }
}

/// Builder for [`PackageRequest`]; `build` performs all validation.
pub struct PackageRequestBuilder {
    package_id: String,
    range: Option<String>,
    get_latest: bool,
    allow_prerelease: bool,
    allow_unlisted: bool,
    exclusive_sources: bool,
    explicit_sources: Vec<Arc<dyn PackageSource>>,
    target: Option<String>,
}

impl PackageRequestBuilder {
    /// Constrain resolution to a version range (interval notation or a bare
    /// minimum version). A blank string is treated as "any version".
    pub fn version_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Request the newest version, ignoring the local cache.
    pub fn get_latest(mut self, get_latest: bool) -> Self {
        self.get_latest = get_latest;
        self
    }

    pub fn allow_prerelease(mut self, allow: bool) -> Self {
        self.allow_prerelease = allow;
        self
    }

    pub fn allow_unlisted(mut self, allow: bool) -> Self {
        self.allow_unlisted = allow;
        self
    }

    /// Restrict resolution to the explicitly provided sources only.
    pub fn exclusive_sources(mut self, exclusive: bool) -> Self {
        self.exclusive_sources = exclusive;
        self
    }

    /// Add a source to query ahead of the ambient remote set.
    pub fn source(mut self, source: Arc<dyn PackageSource>) -> Self {
        self.explicit_sources.push(source);
        self
    }

    /// Platform/framework moniker forwarded to registry queries.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn build(self) -> Result<PackageRequest, RequestError> {
        if self.package_id.trim().is_empty() {
            return Err(RequestError::EmptyPackageId);
        }

        // A blank range string means "any version", same as no range at all.
        let raw_range = self.range.filter(|r| !r.trim().is_empty());

        if raw_range.is_some() && self.get_latest {
            return Err(RequestError::RangeConflictsWithLatest(self.package_id));
        }

        let range = match raw_range {
            Some(raw) => Some(raw.parse::<VersionRange>().map_err(|e| {
                RequestError::InvalidRange {
                    input: raw,
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        Ok(PackageRequest {
            package_id: self.package_id,
            range,
            get_latest: self.get_latest,
            allow_prerelease: self.allow_prerelease,
            allow_unlisted: self.allow_unlisted,
            exclusive_sources: self.exclusive_sources,
            explicit_sources: self.explicit_sources,
            target: self.target,
        })
    }
}
