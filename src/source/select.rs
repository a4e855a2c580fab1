//! Effective source-set selection for one package request.

use std::collections::HashSet;
use std::sync::Arc;

use super::PackageSource;

/// Compute the ordered set of sources to query for one request.
///
/// With `exclusive` set, exactly the explicit sources are used and the
/// ambient remote set is ignored entirely; an empty explicit list is valid
/// and means "search nothing". Otherwise the result is the order-preserving
/// union of explicit sources and remotes, with exact duplicates (same
/// location) removed.
pub fn effective_sources(
    explicit: &[Arc<dyn PackageSource>],
    exclusive: bool,
    remote: &[Arc<dyn PackageSource>],
) -> Vec<Arc<dyn PackageSource>> {
    if exclusive {
        return explicit.to_vec();
    }
    if explicit.is_empty() {
        return remote.to_vec();
    }

    let mut seen = HashSet::new();
    explicit
        .iter()
        .chain(remote.iter())
        .filter(|source| seen.insert(source.location().to_string()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockPackageSource;

    fn source(name: &str, location: &str) -> Arc<dyn PackageSource> {
        let mut mock = MockPackageSource::new();
        mock.expect_name().return_const(name.to_string());
        mock.expect_location().return_const(location.to_string());
        Arc::new(mock)
    }

    fn locations(sources: &[Arc<dyn PackageSource>]) -> Vec<&str> {
        sources.iter().map(|s| s.location()).collect()
    }

    #[test]
    fn test_exclusive_returns_only_explicit() {
        let explicit = vec![source("a", "https://a")];
        let remote = vec![source("b", "https://b"), source("c", "https://c")];

        let selected = effective_sources(&explicit, true, &remote);
        assert_eq!(locations(&selected), vec!["https://a"]);
    }

    #[test]
    fn test_exclusive_with_empty_explicit_searches_nothing() {
        let remote = vec![source("b", "https://b")];
        let selected = effective_sources(&[], true, &remote);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_union_preserves_order_explicit_first() {
        let explicit = vec![source("a", "https://a")];
        let remote = vec![source("b", "https://b"), source("c", "https://c")];

        let selected = effective_sources(&explicit, false, &remote);
        assert_eq!(
            locations(&selected),
            vec!["https://a", "https://b", "https://c"]
        );
    }

    #[test]
    fn test_union_removes_exact_duplicates() {
        let explicit = vec![source("a", "https://a"), source("b", "https://b")];
        let remote = vec![source("b2", "https://b"), source("c", "https://c")];

        let selected = effective_sources(&explicit, false, &remote);
        assert_eq!(
            locations(&selected),
            vec!["https://a", "https://b", "https://c"]
        );
    }

    #[test]
    fn test_no_explicit_returns_remote_unchanged() {
        let remote = vec![source("b", "https://b"), source("c", "https://c")];
        let selected = effective_sources(&[], false, &remote);
        assert_eq!(locations(&selected), vec!["https://b", "https://c"]);
    }
}
