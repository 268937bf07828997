use std::sync::Arc;
use tracing::{info, warn};

use crate::api::ApiState;
use crate::config::AppConfig;
use crate::resolver::{ResolverSources, TokenResolver};
use crate::sources::utils::ProviderCache;
use crate::sources::{
    AlloyOnchainReader, BlockscoutSource, CoinGeckoSource, CreatorRegistry, DexScreenerSource, HoldingsSource,
    MarketDataSource, NameRegistry, OnchainReader, PairSource, PortfolioApiSource, RegistryNameResolver,
    ZoraRegistrySource,
};
use crate::token_registry::{DiscoveryAggregator, DiscoveryScheduler, MarketListings};
use crate::wallet::WalletHoldingsAggregator;

/// Every long-lived service, wired to the live upstream adapters.
pub struct AppContext {
    pub resolver: TokenResolver,
    pub discovery: Arc<DiscoveryAggregator>,
    pub listings: Arc<MarketListings>,
    pub wallet: WalletHoldingsAggregator,
    /// Present when a discovery refresh interval is configured.
    pub scheduler: Option<DiscoveryScheduler>,
}

impl AppContext {
    pub fn from_config(config: &AppConfig) -> Self {
        let provider_cache = ProviderCache::new(config.rpc_endpoints.clone());

        let market: Arc<dyn MarketDataSource> = Arc::new(CoinGeckoSource::new(config.coingecko.clone()));
        let pairs: Arc<dyn PairSource> = Arc::new(DexScreenerSource::new(config.dexscreener.clone()));
        let onchain: Arc<dyn OnchainReader> = Arc::new(AlloyOnchainReader::new(provider_cache.clone()));
        let registry: Arc<dyn CreatorRegistry> = Arc::new(ZoraRegistrySource::new(config.creator_registry.clone()));
        let names: Vec<Arc<dyn NameRegistry>> = vec![
            Arc::new(RegistryNameResolver::basenames(provider_cache.clone())) as Arc<dyn NameRegistry>,
            Arc::new(RegistryNameResolver::ens(provider_cache)),
        ];
        info!("✅ Upstream sources initialized");

        let discovery = Arc::new(DiscoveryAggregator::new(config.discovery.clone(), Arc::clone(&registry)));
        let scheduler = config
            .discovery
            .refresh_interval
            .map(|interval| DiscoveryScheduler::new(Arc::clone(&discovery), interval));

        let resolver = TokenResolver::new(
            config.resolver.clone(),
            ResolverSources {
                market: Arc::clone(&market),
                pairs: Arc::clone(&pairs),
                onchain: Arc::clone(&onchain),
                registry,
                names,
            },
        )
        .with_discovery(Arc::clone(&discovery));
        info!("✅ Token resolver initialized (cache ttl {}s)", config.resolver.cache_ttl.as_secs());

        let listings = Arc::new(MarketListings::new(config.listings.clone(), market));

        let mut holdings: Vec<Arc<dyn HoldingsSource>> = Vec::new();
        if config.portfolio.api_key.is_some() {
            holdings.push(Arc::new(PortfolioApiSource::new(config.portfolio.clone())));
        } else {
            warn!("PORTFOLIO_API_KEY not set, wallet holdings come from the explorer only");
        }
        holdings.push(Arc::new(BlockscoutSource::new(config.blockscout.clone())));
        let wallet = WalletHoldingsAggregator::new(config.wallet.clone(), onchain, holdings, pairs);
        info!("✅ Wallet holdings aggregator initialized");

        Self {
            resolver,
            discovery,
            listings,
            wallet,
            scheduler,
        }
    }

    pub fn api_state(&self) -> ApiState {
        ApiState {
            resolver: self.resolver.clone(),
            discovery: Arc::clone(&self.discovery),
            listings: Arc::clone(&self.listings),
            wallet: self.wallet.clone(),
        }
    }
}
