pub mod discovery_engine;
pub mod market_listings;
pub mod scheduler;

pub use discovery_engine::{search, DiscoveryAggregator, SEARCH_LIMIT};
pub use market_listings::{fallback_tokens, is_stablecoin, ListingsConfig, MarketListings};
pub use scheduler::DiscoveryScheduler;

use std::time::Duration;

use crate::sources::ExploreList;

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Explore lists merged into the pool, in priority order.
    pub lists: Vec<ExploreList>,
    pub per_list: usize,
    pub cache_ttl: Duration,
    /// Background refresh period. `None` disables the scheduler.
    pub refresh_interval: Option<Duration>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            lists: vec![ExploreList::MostValuable, ExploreList::New, ExploreList::TopVolume],
            per_list: 50,
            cache_ttl: Duration::from_secs(60),
            refresh_interval: None,
        }
    }
}
