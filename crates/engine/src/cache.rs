//! Freshness rules for the recommendation cache.
//!
//! The cache table stores, next to each user's rows, the ratings fingerprint
//! (count and total of the user's ratings) seen when the rows were written.
//! A [`CachePolicy`] compares that against the current fingerprint and
//! decides whether the cached rows may be served.

use data_loader::RatingsFingerprint;

/// Decides when cached recommendations are served and when results are stored
pub trait CachePolicy: Send + Sync {
    /// Returns the name of this policy (for logging)
    fn name(&self) -> &str;

    /// Whether rows written under `cached` may be served when the user's
    /// ratings currently look like `current`. `cached` is `None` when the
    /// user has no cache entries.
    fn is_fresh(&self, cached: Option<RatingsFingerprint>, current: RatingsFingerprint) -> bool;

    /// Whether freshly computed recommendations should replace the cache
    fn write_back(&self) -> bool {
        true
    }
}

/// Serve whatever is cached, forever
///
/// Cached rows are never invalidated, even after the user rates more movies.
/// Use `clear-cache` or [`Bypass`] to refresh.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReuseAlways;

impl CachePolicy for ReuseAlways {
    fn name(&self) -> &str {
        "reuse"
    }

    fn is_fresh(&self, cached: Option<RatingsFingerprint>, _current: RatingsFingerprint) -> bool {
        cached.is_some()
    }
}

/// Serve cached rows only if the user's ratings are unchanged since they were written
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintPolicy;

impl CachePolicy for FingerprintPolicy {
    fn name(&self) -> &str {
        "verify"
    }

    fn is_fresh(&self, cached: Option<RatingsFingerprint>, current: RatingsFingerprint) -> bool {
        cached == Some(current)
    }
}

/// Never read or write the cache
#[derive(Debug, Clone, Copy, Default)]
pub struct Bypass;

impl CachePolicy for Bypass {
    fn name(&self) -> &str {
        "bypass"
    }

    fn is_fresh(&self, _cached: Option<RatingsFingerprint>, _current: RatingsFingerprint) -> bool {
        false
    }

    fn write_back(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEFORE: RatingsFingerprint = RatingsFingerprint { count: 3, total: 12.5 };
    const AFTER: RatingsFingerprint = RatingsFingerprint { count: 4, total: 16.0 };

    #[test]
    fn test_reuse_ignores_changes() {
        assert!(ReuseAlways.is_fresh(Some(BEFORE), AFTER));
        assert!(ReuseAlways.is_fresh(Some(BEFORE), BEFORE));
        assert!(!ReuseAlways.is_fresh(None, BEFORE));
        assert!(ReuseAlways.write_back());
    }

    #[test]
    fn test_fingerprint_detects_changes() {
        assert!(FingerprintPolicy.is_fresh(Some(BEFORE), BEFORE));
        assert!(!FingerprintPolicy.is_fresh(Some(BEFORE), AFTER));
        assert!(!FingerprintPolicy.is_fresh(None, BEFORE));
    }

    #[test]
    fn test_bypass_never_touches_cache() {
        assert!(!Bypass.is_fresh(Some(BEFORE), BEFORE));
        assert!(!Bypass.write_back());
    }

    #[test]
    fn test_policies_as_trait_objects() {
        let policies: Vec<Box<dyn CachePolicy>> =
            vec![Box::new(ReuseAlways), Box::new(FingerprintPolicy), Box::new(Bypass)];
        let names: Vec<&str> = policies.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["reuse", "verify", "bypass"]);
    }
}
