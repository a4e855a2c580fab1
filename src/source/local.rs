//! Local on-disk package cache.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;

use super::{PackageSource, PackageVersion, VersionFilter};
use crate::model::{PackageIdentity, parse_version};

/// The local package store.
///
/// Layout is one directory per package, one subdirectory per extracted
/// version: `{root}/{package_id}/{version}/`. The store serves as the local
/// cache source during resolution and answers the persistent "is this
/// identity already present" query used by install verification.
pub struct LocalStore {
    root: PathBuf,
    location: String,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let location = root.display().to_string();
        Self { root, location }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a given identity would be extracted into.
    pub fn version_dir(&self, identity: &PackageIdentity) -> PathBuf {
        self.root
            .join(identity.package_id())
            .join(identity.version().to_string())
    }

    /// Whether the identity is already present in the store.
    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        self.version_dir(identity).is_dir()
    }

    fn list_version_dirs(&self, package_id: &str) -> Result<Vec<PackageVersion>> {
        let package_dir = self.root.join(package_id);
        if !package_dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&package_dir)
            .with_context(|| format!("Failed to read package directory {:?}", package_dir))?;

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("Failed to read entry in {:?}", package_dir))?;
            if !entry.path().is_dir() {
                continue;
            }
            let dir_name = entry.file_name();
            let Some(name) = dir_name.to_str() else {
                continue;
            };
            match parse_version(name) {
                Some(version) => versions.push(PackageVersion::new(version)),
                None => {
                    debug!(
                        "Skipping non-version directory {:?} under {:?}",
                        name, package_dir
                    );
                }
            }
        }
        Ok(versions)
    }
}

#[async_trait]
impl PackageSource for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    fn location(&self) -> &str {
        &self.location
    }

    #[tracing::instrument(skip(self, filter))]
    async fn list_versions(
        &self,
        package_id: &str,
        filter: &VersionFilter,
    ) -> Result<Vec<PackageVersion>> {
        let versions = self.list_version_dirs(package_id)?;
        Ok(versions
            .into_iter()
            .filter(|candidate| filter.admits(candidate))
            .collect())
    }
}
