//! Process-wide idempotency ledger for package installation.
//!
//! The ledger is explicit shared state handed to every resolution/install
//! call. It records which identities have been verified or installed during
//! this run and arbitrates exclusive install attempts per identity via a
//! per-key async mutex. Entries are never removed mid-run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use log::debug;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::install::PackageInstaller;
use crate::model::PackageIdentity;

/// Installation state of one identity within this process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallState {
    /// Known but not yet confirmed installed; a failed attempt stays here so
    /// a future run can retry.
    #[default]
    Pending,
    /// Confirmed already present on disk without installing this run.
    Verified,
    /// Installed by this run.
    Completed,
}

#[derive(Default)]
struct Entry {
    state: InstallState,
    gate: Option<Arc<AsyncMutex<()>>>,
}

/// The idempotency ledger. Cheap to share via `Arc`.
#[derive(Default)]
pub struct InstallLedger {
    entries: Mutex<HashMap<PackageIdentity, Entry>>,
}

impl InstallLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current recorded state, if the identity has been seen this run.
    pub fn state(&self, identity: &PackageIdentity) -> Option<InstallState> {
        self.entries
            .lock()
            .unwrap()
            .get(identity)
            .map(|entry| entry.state)
    }

    fn set_state(&self, identity: &PackageIdentity, state: InstallState) {
        let mut entries = self.entries.lock().unwrap();
        entries.entry(identity.clone()).or_default().state = state;
    }

    /// Whether the identity is already installed, without installing.
    ///
    /// Answers from the ledger when possible; otherwise asks the external
    /// package store and memoizes a positive answer, so repeated calls do
    /// not pay the on-disk check again.
    pub async fn verify(
        &self,
        identity: &PackageIdentity,
        installer: &dyn PackageInstaller,
    ) -> Result<bool> {
        if matches!(
            self.state(identity),
            Some(InstallState::Verified | InstallState::Completed)
        ) {
            return Ok(true);
        }

        if installer.is_installed(identity).await? {
            debug!("{} found already present; recording as verified", identity);
            self.set_state(identity, InstallState::Verified);
            return Ok(true);
        }
        Ok(false)
    }

    /// Begin an install attempt; at most one scope per identity exists at a
    /// time, other callers wait here until the holder releases it.
    pub async fn acquire(&self, identity: &PackageIdentity) -> InstallScope<'_> {
        let gate = {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries.entry(identity.clone()).or_default();
            entry
                .gate
                .get_or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = gate.lock_owned().await;
        InstallScope {
            ledger: self,
            identity: identity.clone(),
            _guard: guard,
        }
    }
}

/// Exclusive install scope for one identity.
///
/// Dropping the scope always frees waiters. Only an explicit [`complete`]
/// marks the identity as installed; a scope dropped after a failed delegated
/// install leaves the identity retryable.
///
/// [`complete`]: InstallScope::complete
pub struct InstallScope<'a> {
    ledger: &'a InstallLedger,
    identity: PackageIdentity,
    _guard: OwnedMutexGuard<()>,
}

impl InstallScope<'_> {
    pub fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    /// Record the install as completed and release the scope.
    pub fn complete(self) {
        self.ledger.set_state(&self.identity, InstallState::Completed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::MockPackageInstaller;
    use crate::test_utils::version;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn identity(id: &str, v: &str) -> PackageIdentity {
        PackageIdentity::new(id, version(v))
    }

    #[tokio::test]
    async fn test_verify_asks_store_once_and_memoizes() {
        let ledger = InstallLedger::new();
        let id = identity("tool", "1.0.0");

        let mut installer = MockPackageInstaller::new();
        installer
            .expect_is_installed()
            .times(1)
            .returning(|_| Ok(true));

        assert!(ledger.verify(&id, &installer).await.unwrap());
        assert_eq!(ledger.state(&id), Some(InstallState::Verified));

        // Second verify answers from the ledger; the mock allows one call only.
        assert!(ledger.verify(&id, &installer).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_not_installed() {
        let ledger = InstallLedger::new();
        let id = identity("tool", "1.0.0");

        let mut installer = MockPackageInstaller::new();
        installer.expect_is_installed().returning(|_| Ok(false));

        assert!(!ledger.verify(&id, &installer).await.unwrap());
        // A negative answer is not memoized as installed.
        assert_ne!(ledger.state(&id), Some(InstallState::Verified));
    }

    #[tokio::test]
    async fn test_verify_true_after_complete() {
        let ledger = InstallLedger::new();
        let id = identity("tool", "1.0.0");

        let scope = ledger.acquire(&id).await;
        scope.complete();
        assert_eq!(ledger.state(&id), Some(InstallState::Completed));

        // No store query needed once completed.
        let installer = MockPackageInstaller::new();
        assert!(ledger.verify(&id, &installer).await.unwrap());
    }

    #[tokio::test]
    async fn test_drop_without_complete_leaves_identity_retryable() {
        let ledger = InstallLedger::new();
        let id = identity("tool", "1.0.0");

        {
            let _scope = ledger.acquire(&id).await;
            // Simulated install failure: scope dropped without complete().
        }
        assert_eq!(ledger.state(&id), Some(InstallState::Pending));

        // The gate is free again for a retry.
        let scope = ledger.acquire(&id).await;
        scope.complete();
        assert_eq!(ledger.state(&id), Some(InstallState::Completed));
    }

    #[tokio::test]
    async fn test_acquire_is_exclusive_per_identity() {
        let ledger = Arc::new(InstallLedger::new());
        let id = identity("tool", "1.0.0");
        let concurrent = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            let id = id.clone();
            let concurrent = Arc::clone(&concurrent);
            let peak = Arc::clone(&peak);
            tasks.push(tokio::spawn(async move {
                let scope = ledger.acquire(&id).await;
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
                drop(scope);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_identities_do_not_block_each_other() {
        let ledger = InstallLedger::new();
        let a = identity("tool", "1.0.0");
        let b = identity("tool", "2.0.0");

        let scope_a = ledger.acquire(&a).await;
        // Must not deadlock: b has its own gate.
        let scope_b = ledger.acquire(&b).await;
        scope_a.complete();
        scope_b.complete();
    }

    #[tokio::test]
    async fn test_entries_survive_for_whole_run() {
        let ledger = InstallLedger::new();
        let id = identity("tool", "1.0.0");
        ledger.acquire(&id).await.complete();

        // State stays put; nothing prunes the map mid-run.
        for _ in 0..3 {
            assert_eq!(ledger.state(&id), Some(InstallState::Completed));
        }
    }
}
