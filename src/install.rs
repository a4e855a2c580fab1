//! Install orchestration: verify, acquire, delegate, complete.
//!
//! The orchestrator owns the control flow around installation but never
//! fetches or unpacks anything itself. The actual package acquisition is
//! behind the [`PackageInstaller`] trait so the embedding application (or a
//! mock in tests) supplies it.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::future::join_all;
use log::{debug, error, info};
use semver::Version;

use crate::ledger::InstallLedger;
use crate::model::{PackageIdentity, PackageRequest};
use crate::resolver::VersionResolver;
use crate::source::{PackageSource, effective_sources};

/// How a delegated installer should pick versions for transitive
/// dependencies it discovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyStrategy {
    /// Lowest version satisfying each dependency range.
    #[default]
    Lowest,
    /// Highest version satisfying each dependency range.
    Highest,
    /// Do not walk dependencies at all.
    Ignore,
}

/// Policy handed to the delegated installer alongside the identity.
#[derive(Debug, Clone, Default)]
pub struct InstallPolicy {
    pub allow_prerelease: bool,
    pub allow_unlisted: bool,
    pub dependency_strategy: DependencyStrategy,
}

/// External package-management boundary.
///
/// `is_installed` is the presence probe used for idempotency checks;
/// `fetch_and_install` performs the actual acquisition for an exact
/// identity. Implementations must be safe to call concurrently for
/// different identities; the orchestrator guarantees at most one in-flight
/// call per identity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    async fn is_installed(&self, identity: &PackageIdentity) -> Result<bool>;

    async fn fetch_and_install(
        &self,
        identity: &PackageIdentity,
        sources: &[Arc<dyn PackageSource>],
        policy: &InstallPolicy,
    ) -> Result<()>;
}

/// Drives resolution and idempotent installation for package requests.
pub struct InstallOrchestrator<I: PackageInstaller> {
    installer: Arc<I>,
    ledger: Arc<InstallLedger>,
    resolver: VersionResolver,
    remote_sources: Vec<Arc<dyn PackageSource>>,
    local_source: Option<Arc<dyn PackageSource>>,
}

impl<I: PackageInstaller> InstallOrchestrator<I> {
    pub fn new(
        installer: Arc<I>,
        ledger: Arc<InstallLedger>,
        resolver: VersionResolver,
        remote_sources: Vec<Arc<dyn PackageSource>>,
        local_source: Option<Arc<dyn PackageSource>>,
    ) -> Self {
        Self {
            installer,
            ledger,
            resolver,
            remote_sources,
            local_source,
        }
    }

    pub fn ledger(&self) -> &Arc<InstallLedger> {
        &self.ledger
    }

    /// Install the resolved version of `request`, if any.
    ///
    /// A `None` resolution is a quiet no-op: resolution failure is not an
    /// install failure. An already-installed identity is skipped. Otherwise
    /// the install runs under the identity's exclusive scope, and only a
    /// successful delegated install marks it completed.
    #[tracing::instrument(skip(self, request, sources), fields(package_id = request.package_id()))]
    pub async fn install(
        &self,
        request: &PackageRequest,
        resolved: Option<&Version>,
        sources: &[Arc<dyn PackageSource>],
    ) -> Result<()> {
        let Some(version) = resolved else {
            debug!(
                "No version resolved for {}, nothing to install",
                request.package_id()
            );
            return Ok(());
        };
        let identity = PackageIdentity::new(request.package_id(), version.clone());

        if self.ledger.verify(&identity, self.installer.as_ref()).await? {
            info!("{} is already installed, skipping", identity);
            return Ok(());
        }

        let scope = self.ledger.acquire(&identity).await;

        // A waiter that queued behind another task installing the same
        // identity re-checks before duplicating the work.
        if self.ledger.verify(&identity, self.installer.as_ref()).await? {
            info!("{} was installed while waiting, skipping", identity);
            return Ok(());
        }

        let policy = InstallPolicy {
            allow_prerelease: request.allow_prerelease(),
            allow_unlisted: request.allow_unlisted(),
            dependency_strategy: DependencyStrategy::Lowest,
        };
        self.installer
            .fetch_and_install(&identity, sources, &policy)
            .await
            .with_context(|| format!("Failed to install {}", identity))?;

        scope.complete();
        info!("Installed {}", identity);
        Ok(())
    }

    /// Resolve and install one request end to end.
    ///
    /// Returns the resolved version, or `Ok(None)` when no candidate
    /// satisfied the request.
    pub async fn ensure(&self, request: &PackageRequest, update: bool) -> Result<Option<Version>> {
        let sources = effective_sources(
            request.explicit_sources(),
            request.exclusive_sources(),
            &self.remote_sources,
        );
        let resolved = self
            .resolver
            .resolve(request, update, &sources, self.local_source.as_ref())
            .await;
        self.install(request, resolved.as_ref(), &sources).await?;
        Ok(resolved)
    }

    /// Resolve and install a batch of requests concurrently.
    ///
    /// One request's failure never aborts the others; each outcome is
    /// reported per package id.
    pub async fn ensure_all(
        &self,
        requests: &[PackageRequest],
        update: bool,
    ) -> Vec<(String, Result<Option<Version>>)> {
        let outcomes = join_all(requests.iter().map(|request| async move {
            let outcome = self.ensure(request, update).await;
            if let Err(err) = &outcome {
                error!("Failed to restore {}: {:#}", request.package_id(), err);
            }
            (request.package_id().to_string(), outcome)
        }))
        .await;
        outcomes
    }
}
