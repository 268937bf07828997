use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::DiscoveryConfig;
use crate::cache::{CacheStats, Clock, QueryCache, SystemClock};
use crate::sources::{CreatorRegistry, ExploreList};
use crate::types::DiscoveryCandidate;

/// Maximum candidates returned by a pool search.
pub const SEARCH_LIMIT: usize = 5;

const POOL_KEY: &str = "pool";

/// Merges the registry's explore lists into one deduplicated candidate pool.
pub struct DiscoveryAggregator {
    config: DiscoveryConfig,
    registry: Arc<dyn CreatorRegistry>,
    cache: QueryCache<String, Vec<DiscoveryCandidate>>,
}

impl DiscoveryAggregator {
    pub fn new(config: DiscoveryConfig, registry: Arc<dyn CreatorRegistry>) -> Self {
        Self::with_clock(config, registry, Arc::new(SystemClock))
    }

    pub fn with_clock(config: DiscoveryConfig, registry: Arc<dyn CreatorRegistry>, clock: Arc<dyn Clock>) -> Self {
        let cache = QueryCache::with_clock("discovery-pool", config.cache_ttl, clock);
        Self { config, registry, cache }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Current pool, fetched at most once per staleness window. An empty
    /// pool is not cached so the next caller retries.
    pub async fn refresh_pool(&self) -> Vec<DiscoveryCandidate> {
        let registry = Arc::clone(&self.registry);
        let lists = self.config.lists.clone();
        let per_list = self.config.per_list;

        self.cache
            .get_or_fetch_if(
                POOL_KEY.to_string(),
                move || fetch_pool(registry, lists, per_list),
                |pool| !pool.is_empty(),
            )
            .await
    }

    /// Fetch a new pool now and swap it in. When every list fails the
    /// current pool stays in place.
    pub async fn force_refresh(&self) -> Vec<DiscoveryCandidate> {
        let pool = fetch_pool(Arc::clone(&self.registry), self.config.lists.clone(), self.config.per_list).await;
        if pool.is_empty() {
            warn!("Discovery refresh came back empty, keeping the current pool");
            return self.cache.get(&POOL_KEY.to_string()).unwrap_or_default();
        }
        self.cache.insert(POOL_KEY.to_string(), pool.clone());
        pool
    }

    pub async fn search(&self, query: &str) -> Vec<DiscoveryCandidate> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let pool = self.refresh_pool().await;
        search(&pool, query)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

async fn fetch_pool(registry: Arc<dyn CreatorRegistry>, lists: Vec<ExploreList>, per_list: usize) -> Vec<DiscoveryCandidate> {
    let start = Instant::now();
    let fetches = lists.iter().map(|list| {
        let registry = Arc::clone(&registry);
        let list = *list;
        async move {
            match registry.explore(list, per_list).await {
                Ok(nodes) => nodes,
                Err(e) => {
                    warn!("Explore list {} failed: {}", list.list_type(), e);
                    Vec::new()
                }
            }
        }
    });
    let results = join_all(fetches).await;

    let mut seen = HashSet::new();
    let pool: Vec<DiscoveryCandidate> = results
        .into_iter()
        .flatten()
        .map(|node| node.to_candidate())
        .filter(|candidate| !candidate.address.is_empty() && seen.insert(candidate.address.to_lowercase()))
        .collect();

    info!(
        "✅ Discovery pool refreshed: {} candidates from {} lists in {}ms",
        pool.len(),
        lists.len(),
        start.elapsed().as_millis()
    );
    pool
}

/// Case-insensitive prefix match on name or symbol, capped at
/// [`SEARCH_LIMIT`].
pub fn search(pool: &[DiscoveryCandidate], query: &str) -> Vec<DiscoveryCandidate> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    pool.iter()
        .filter(|candidate| candidate.matches_prefix(&query))
        .take(SEARCH_LIMIT)
        .cloned()
        .collect()
}
