// Token resolution: identifier -> canonical TokenData via ordered fallbacks
pub mod creator_coin;
pub mod query;
pub mod strategy;

pub use creator_coin::{CreatorCoinAggregator, CREATOR_CIRCULATING_SHARE};
pub use query::{QueryKind, ResolutionQuery, SelectionGuard};
pub use strategy::{first_success, AddressStrategy, Attempt, TextStrategy};

use futures::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, Clock, QueryCache, SystemClock};
use crate::sources::dexscreener::most_liquid_pair;
use crate::sources::utils::{default_logo, TokenUtils};
use crate::sources::{CreatorRegistry, MarketDataSource, NameRegistry, OnchainReader, PairSource, SourceError};
use crate::token_registry::DiscoveryAggregator;
use crate::types::{Chain, TokenData};

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub chain: Chain,
    pub cache_ttl: Duration,
    pub address_order: Vec<AddressStrategy>,
    pub text_order: Vec<TextStrategy>,
    /// Lower-cased name -> token address, consulted before name registries.
    pub aliases: HashMap<String, String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let mut aliases = HashMap::new();
        // The basename points at the creator's wallet, not their coin.
        aliases.insert(
            "scottexplores.base.eth".to_string(),
            "0xf5546bf64475b8ece6ac031e92e4f91a88d9dc5e".to_string(),
        );

        Self {
            chain: Chain::Base,
            cache_ttl: Duration::from_secs(60),
            address_order: AddressStrategy::default_order(),
            text_order: TextStrategy::default_order(),
            aliases,
        }
    }
}

/// Adapters the resolver draws on.
#[derive(Clone)]
pub struct ResolverSources {
    pub market: Arc<dyn MarketDataSource>,
    pub pairs: Arc<dyn PairSource>,
    pub onchain: Arc<dyn OnchainReader>,
    pub registry: Arc<dyn CreatorRegistry>,
    pub names: Vec<Arc<dyn NameRegistry>>,
}

/// Resolves heterogeneous identifiers into one canonical [`TokenData`].
///
/// Never returns an error: every adapter failure is logged and the next
/// strategy is tried. Successful resolutions are cached per normalized
/// identifier; concurrent lookups of the same identifier share one fetch.
#[derive(Clone)]
pub struct TokenResolver {
    config: Arc<ResolverConfig>,
    sources: ResolverSources,
    creator_coins: CreatorCoinAggregator,
    discovery: Option<Arc<DiscoveryAggregator>>,
    cache: Arc<QueryCache<String, Option<TokenData>>>,
}

impl TokenResolver {
    pub fn new(config: ResolverConfig, sources: ResolverSources) -> Self {
        Self::with_clock(config, sources, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ResolverConfig, sources: ResolverSources, clock: Arc<dyn Clock>) -> Self {
        let creator_coins = CreatorCoinAggregator::new(
            config.chain,
            sources.onchain.clone(),
            sources.pairs.clone(),
            sources.registry.clone(),
            sources.names.clone(),
        );
        let cache = Arc::new(QueryCache::with_clock("token-resolver", config.cache_ttl, clock));

        Self {
            config: Arc::new(config),
            sources,
            creator_coins,
            discovery: None,
            cache,
        }
    }

    /// Enable the discovery-pool fallback for free-text identifiers.
    pub fn with_discovery(mut self, discovery: Arc<DiscoveryAggregator>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn chain(&self) -> Chain {
        self.config.chain
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn resolve(&self, identifier: &str) -> Option<TokenData> {
        let query = ResolutionQuery::infer(identifier)?;
        self.resolve_query(query).await
    }

    pub async fn resolve_query(&self, query: ResolutionQuery) -> Option<TokenData> {
        if !query.is_well_formed() {
            debug!("Rejecting malformed identifier {:?}", query.identifier);
            return None;
        }

        let key = query.cache_key();
        let this = self.clone();
        self.cache
            .get_or_fetch_if(key, move || async move { this.resolve_uncached(query).await }, |r| r.is_some())
            .await
    }

    /// Resolve on behalf of a holder, dropping the result if the holder has
    /// selected something else in the meantime.
    pub async fn resolve_selection(&self, guard: &SelectionGuard, identifier: &str) -> Option<TokenData> {
        guard.select(identifier);
        let token = self.resolve(identifier).await;
        match guard.accept(identifier, token) {
            Some(token) => token,
            None => {
                debug!("Discarding stale resolution for {}", identifier);
                None
            }
        }
    }

    async fn resolve_uncached(&self, query: ResolutionQuery) -> Option<TokenData> {
        let resolved = match query.kind {
            QueryKind::Name => match self.resolve_name(&query.identifier).await {
                Some(address) => self.resolve_address(&address).await,
                None => None,
            },
            QueryKind::ContractAddress => self.resolve_address(&query.identifier).await,
            QueryKind::SymbolOrId => self.resolve_text(&query.identifier, true).await,
            QueryKind::FreeText => self.resolve_text(&query.identifier, false).await,
        };

        match &resolved {
            Some(token) => info!("✅ Resolved {} to {} ({})", query.identifier, token.symbol, token.id),
            None => info!("No token found for {}", query.identifier),
        }
        resolved.map(with_default_logo)
    }

    /// Alias table first, then the registry responsible for the suffix.
    /// Failure is terminal.
    async fn resolve_name(&self, name: &str) -> Option<String> {
        let name = name.trim().to_lowercase();
        if let Some(address) = self.config.aliases.get(&name) {
            debug!("Using alias {} -> {}", name, address);
            return Some(address.clone());
        }

        let registry = match self.sources.names.iter().find(|r| r.handles(&name)) {
            Some(registry) => registry,
            None => {
                debug!("No name registry handles {}", name);
                return None;
            }
        };

        match registry.resolve_name(&name).await {
            Ok(Some(address)) => Some(address),
            Ok(None) => {
                debug!("{} has no address for {}", registry.registry_name(), name);
                None
            }
            Err(e) => {
                warn!("{} lookup for {} failed: {}", registry.registry_name(), name, e);
                None
            }
        }
    }

    async fn resolve_address(&self, address: &str) -> Option<TokenData> {
        if !TokenUtils::is_valid_address(address) {
            return None;
        }
        let address = TokenUtils::normalize_address(address);

        let attempts: Vec<(&'static str, Attempt<'_, TokenData>)> = self
            .config
            .address_order
            .iter()
            .map(|strategy| (strategy.name(), self.address_attempt(*strategy, &address)))
            .collect();
        first_success(&address, attempts, TokenData::is_valid).await
    }

    fn address_attempt<'a>(&'a self, strategy: AddressStrategy, address: &'a str) -> Attempt<'a, TokenData> {
        match strategy {
            AddressStrategy::CreatorRegistry => self.registry_coin(address).boxed(),
            AddressStrategy::CreatorCoin => self.creator_coins.fetch(address).boxed(),
            AddressStrategy::MarketByContract => self.sources.market.token_by_contract(self.config.chain, address),
            AddressStrategy::DexPair => self.dex_pair(address).boxed(),
        }
    }

    async fn resolve_text(&self, identifier: &str, allow_market_id: bool) -> Option<TokenData> {
        let attempts: Vec<(&'static str, Attempt<'_, TokenData>)> = self
            .config
            .text_order
            .iter()
            .filter(|strategy| allow_market_id || **strategy != TextStrategy::MarketById)
            .map(|strategy| (strategy.name(), self.text_attempt(*strategy, identifier)))
            .collect();
        first_success(identifier, attempts, TokenData::is_valid).await
    }

    fn text_attempt<'a>(&'a self, strategy: TextStrategy, identifier: &'a str) -> Attempt<'a, TokenData> {
        match strategy {
            TextStrategy::MarketById => self.market_by_id(identifier).boxed(),
            TextStrategy::CreatorProfile => self.creator_profile(identifier).boxed(),
            TextStrategy::DiscoveryPool => self.discovery_pool(identifier).boxed(),
        }
    }

    async fn registry_coin(&self, address: &str) -> Result<Option<TokenData>, SourceError> {
        let node = self.sources.registry.coin(address).await?;
        Ok(node.filter(|n| n.is_creator_coin()).map(|n| n.to_token_data()))
    }

    async fn dex_pair(&self, address: &str) -> Result<Option<TokenData>, SourceError> {
        let pairs = self.sources.pairs.pairs_for_tokens(&[address.to_string()]).await?;
        Ok(most_liquid_pair(&pairs, address).map(|pair| pair.to_token_data(self.config.chain)))
    }

    /// Market lookup by id. A ticker such as `eth` is not an id, so a miss
    /// maps an exact symbol match from market search onto its id.
    async fn market_by_id(&self, id: &str) -> Result<Option<TokenData>, SourceError> {
        let markets = self.sources.market.markets_by_ids(&[id.to_string()]).await?;
        let token = markets
            .iter()
            .find(|t| t.id.eq_ignore_ascii_case(id))
            .or_else(|| markets.first())
            .cloned();
        if token.is_some() {
            return Ok(token);
        }

        let hits = self.sources.market.search(id).await?;
        let hit = match hits.into_iter().find(|hit| hit.symbol.eq_ignore_ascii_case(id)) {
            Some(hit) => hit,
            None => return Ok(None),
        };
        debug!("Ticker {} maps to market id {}", id, hit.id);
        let markets = self.sources.market.markets_by_ids(&[hit.id.clone()]).await?;
        Ok(markets.into_iter().find(|t| t.id.eq_ignore_ascii_case(&hit.id)))
    }

    async fn creator_profile(&self, handle: &str) -> Result<Option<TokenData>, SourceError> {
        let profile = match self.sources.registry.profile(handle).await? {
            Some(profile) => profile,
            None => return Ok(None),
        };
        match profile.creator_coin {
            Some(coin) => Ok(self.resolve_address(&coin.address).await),
            None => {
                debug!("Profile {} has no creator coin", handle);
                Ok(None)
            }
        }
    }

    async fn discovery_pool(&self, query: &str) -> Result<Option<TokenData>, SourceError> {
        let discovery = match &self.discovery {
            Some(discovery) => discovery,
            None => return Ok(None),
        };
        match discovery.search(query).await.into_iter().next() {
            Some(candidate) => Ok(self.resolve_address(&candidate.address).await),
            None => Ok(None),
        }
    }
}

fn with_default_logo(mut token: TokenData) -> TokenData {
    if token.image.is_none() {
        token.image = default_logo(&token.symbol).map(str::to_string);
    }
    token
}
