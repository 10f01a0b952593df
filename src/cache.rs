//! Scan result cache.
//!
//! Memoizes scan reports per owner for a freshness window, and coalesces
//! concurrent requests for the same uncached owner into a single upstream
//! scan. Failures are never cached: the next request for that owner
//! retries immediately.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use crate::account::ScanReport;
use crate::config::RecoveryConfig;
use crate::error::RecoveryError;
use crate::scanner::AccountScanner;

/// A cached scan report and its freshness deadline.
#[derive(Clone)]
pub struct CachedScanResult {
    pub report: Arc<ScanReport>,
    pub expires_at: Instant,
}

impl CachedScanResult {
    fn is_fresh(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

/// TTL cache over [`AccountScanner`] with per-owner singleflight.
///
/// The entry map takes concurrent readers; writes hold the map only long
/// enough to insert. The guard map hands out one small mutex per owner so
/// that late arrivals for an in-flight owner wait for the first scan and
/// then read its cached result instead of duplicating the upstream work.
pub struct ScanCache {
    scanner: Arc<AccountScanner>,
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedScanResult>>,
    guards: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ScanCache {
    pub fn new(scanner: Arc<AccountScanner>, ttl: Duration) -> Self {
        Self {
            scanner,
            ttl,
            entries: RwLock::new(HashMap::new()),
            guards: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(scanner: Arc<AccountScanner>, config: &RecoveryConfig) -> Self {
        Self::new(scanner, Duration::from_secs(config.cache_ttl_secs))
    }

    /// Return the cached report for `owner`, scanning on miss or expiry.
    ///
    /// At most one scan per owner is in flight at any time. Errors
    /// propagate uncached.
    pub async fn get_or_scan(&self, owner: &str) -> Result<Arc<ScanReport>, RecoveryError> {
        if let Some(report) = self.lookup(owner).await {
            tracing::debug!("Cache hit for owner {}", owner);
            return Ok(report);
        }

        let guard = self.owner_guard(owner).await;
        let _held = guard.lock().await;

        // Another request may have completed the scan while we waited on
        // the guard.
        if let Some(report) = self.lookup(owner).await {
            tracing::debug!("Cache filled while waiting for owner {}", owner);
            return Ok(report);
        }

        let report = Arc::new(self.scanner.scan(owner).await?);

        let mut entries = self.entries.write().await;
        entries.insert(
            owner.to_string(),
            CachedScanResult {
                report: report.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );

        Ok(report)
    }

    /// Drop the cached entry for one owner, forcing the next request to
    /// rescan.
    pub async fn invalidate(&self, owner: &str) {
        self.entries.write().await.remove(owner);
    }

    /// Remove expired entries and idle guards. Lazy expiry on access keeps
    /// results correct without this; the sweep only bounds memory.
    pub async fn purge_expired(&self) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_fresh());
        drop(entries);

        let mut guards = self.guards.lock().await;
        guards.retain(|_, guard| Arc::strong_count(guard) > 1);
    }

    /// Number of cached entries, fresh or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn lookup(&self, owner: &str) -> Option<Arc<ScanReport>> {
        let entries = self.entries.read().await;
        entries
            .get(owner)
            .filter(|entry| entry.is_fresh())
            .map(|entry| entry.report.clone())
    }

    async fn owner_guard(&self, owner: &str) -> Arc<Mutex<()>> {
        let mut guards = self.guards.lock().await;
        guards
            .entry(owner.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::client::mock::MockChainClient;
    use crate::client::ChainClient;

    const OWNER: &str = "11111111111111111111111111111111";
    const RENT: u64 = 2_039_280;

    fn cache_with(client: MockChainClient, ttl: Duration) -> (ScanCache, Arc<MockChainClient>) {
        let client = Arc::new(client);
        let config = RecoveryConfig::default();
        let scanner = Arc::new(AccountScanner::new(
            client.clone() as Arc<dyn ChainClient>,
            &config,
        ));
        (ScanCache::new(scanner, ttl), client)
    }

    fn one_account_client() -> MockChainClient {
        MockChainClient::default().with_account("acct-1", "mint-1", RENT + 5_000_000, 0.0)
    }

    #[tokio::test]
    async fn test_concurrent_requests_coalesce() {
        let (cache, client) = cache_with(one_account_client(), Duration::from_secs(60));

        let (a, b) = tokio::join!(cache.get_or_scan(OWNER), cache.get_or_scan(OWNER));

        assert_eq!(a.unwrap().summaries.len(), 1);
        assert_eq!(b.unwrap().summaries.len(), 1);
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_until_expiry() {
        let (cache, client) = cache_with(one_account_client(), Duration::from_secs(60));

        let first = cache.get_or_scan(OWNER).await.unwrap();
        let second = cache.get_or_scan(OWNER).await.unwrap();

        // Same shared report, one upstream scan
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expiry_triggers_rescan() {
        let (cache, client) = cache_with(one_account_client(), Duration::from_millis(10));

        cache.get_or_scan(OWNER).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.get_or_scan(OWNER).await.unwrap();

        assert_eq!(client.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let (cache, client) = cache_with(one_account_client(), Duration::from_secs(60));

        client.fail_listing.store(true, Ordering::SeqCst);
        assert!(cache.get_or_scan(OWNER).await.is_err());
        assert!(cache.is_empty().await);

        // Endpoint recovers; the very next request succeeds
        client.fail_listing.store(false, Ordering::SeqCst);
        let report = cache.get_or_scan(OWNER).await.unwrap();
        assert_eq!(report.summaries.len(), 1);
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_owner_propagates() {
        let (cache, client) = cache_with(one_account_client(), Duration::from_secs(60));

        let err = cache.get_or_scan("nope!").await.unwrap_err();
        assert!(matches!(err, RecoveryError::InvalidAddress(_)));
        assert_eq!(client.list_calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (cache, _) = cache_with(one_account_client(), Duration::from_millis(10));

        cache.get_or_scan(OWNER).await.unwrap();
        assert_eq!(cache.len().await, 1);

        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.purge_expired().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_forces_rescan() {
        let (cache, client) = cache_with(one_account_client(), Duration::from_secs(60));

        cache.get_or_scan(OWNER).await.unwrap();
        cache.invalidate(OWNER).await;
        cache.get_or_scan(OWNER).await.unwrap();

        assert_eq!(client.list_calls.load(Ordering::SeqCst), 2);
    }
}
