// In-process fake adapters shared by the integration tests
#![allow(dead_code)]

use alloy::primitives::U256;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use capcompare_backend::cache::ManualClock;
use capcompare_backend::resolver::{ResolverConfig, ResolverSources, TokenResolver};
use capcompare_backend::sources::{
    CreatorCoinNode, CreatorProfile, CreatorRegistry, CreatorTokenMetadata, DexPair, ExploreList, HoldingBalance,
    HoldingsSource, MarketDataSource, MarketSearchHit, NameRegistry, OnchainReader, OnchainTokenMetadata,
    PairSource, SourceError,
};
use capcompare_backend::types::{Chain, TokenData};

pub const CREATOR_COIN: &str = "0xc0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0";
pub const BASE_TOKEN: &str = "0xb0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0";
pub const WALLET: &str = "0x1111111111111111111111111111111111111111";

fn down(source: &str) -> SourceError {
    SourceError::Unavailable(format!("{} is down", source))
}

pub fn token(id: &str, symbol: &str, price: f64, market_cap: f64) -> TokenData {
    let mut token = TokenData::new(id, symbol, symbol.to_uppercase());
    token.current_price = price;
    token.market_cap = market_cap;
    token
}

pub fn creator_node(address: &str, name: &str, symbol: &str, coin_type: &str, market_cap: f64) -> CreatorCoinNode {
    serde_json::from_value(json!({
        "address": address,
        "name": name,
        "symbol": symbol,
        "coinType": coin_type,
        "marketCap": market_cap.to_string(),
        "totalSupply": "1000000000",
    }))
    .unwrap()
}

pub fn pair(base: &str, symbol: &str, price: &str, liquidity: f64, fdv: f64, image: Option<&str>) -> DexPair {
    serde_json::from_value(json!({
        "chainId": "base",
        "dexId": "uniswap",
        "pairAddress": "0x9999999999999999999999999999999999999999",
        "baseToken": { "address": base, "name": symbol, "symbol": symbol },
        "priceUsd": price,
        "fdv": fdv,
        "liquidity": { "usd": liquidity },
        "info": image.map(|url| json!({ "imageUrl": url })),
    }))
    .unwrap()
}

#[derive(Default)]
pub struct FakeMarket {
    pub by_id: HashMap<String, TokenData>,
    pub by_contract: HashMap<String, TokenData>,
    pub top: Vec<TokenData>,
    pub hits: Vec<MarketSearchHit>,
    pub fail: bool,
    /// Latency added to id lookups.
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeMarket {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for FakeMarket {
    async fn markets_by_ids(&self, ids: &[String]) -> Result<Vec<TokenData>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(down("market"));
        }
        Ok(ids.iter().filter_map(|id| self.by_id.get(id).cloned()).collect())
    }

    async fn token_by_contract(&self, _chain: Chain, address: &str) -> Result<Option<TokenData>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(down("market"));
        }
        Ok(self.by_contract.get(address).cloned())
    }

    async fn search(&self, _query: &str) -> Result<Vec<MarketSearchHit>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(down("market"));
        }
        Ok(self.hits.clone())
    }

    async fn top_markets(&self, per_page: usize) -> Result<Vec<TokenData>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(down("market"));
        }
        Ok(self.top.iter().take(per_page).cloned().collect())
    }

    fn source_name(&self) -> &'static str {
        "FakeMarket"
    }
}

#[derive(Default)]
pub struct FakePairs {
    pub pairs: Vec<DexPair>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakePairs {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PairSource for FakePairs {
    async fn pairs_for_tokens(&self, addresses: &[String]) -> Result<Vec<DexPair>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(down("pairs"));
        }
        Ok(self
            .pairs
            .iter()
            .filter(|p| addresses.iter().any(|a| a.eq_ignore_ascii_case(&p.base_token.address)))
            .cloned()
            .collect())
    }

    fn source_name(&self) -> &'static str {
        "FakePairs"
    }
}

#[derive(Default)]
pub struct FakeOnchain {
    pub metadata: HashMap<String, OnchainTokenMetadata>,
    pub native: U256,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeOnchain {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OnchainReader for FakeOnchain {
    async fn token_metadata(&self, _chain: Chain, address: &str) -> Result<OnchainTokenMetadata, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SourceError::Contract("execution reverted".to_string()));
        }
        Ok(self.metadata.get(address).cloned().unwrap_or_default())
    }

    async fn native_balance(&self, _chain: Chain, _owner: &str) -> Result<U256, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SourceError::Contract("rpc unavailable".to_string()));
        }
        Ok(self.native)
    }
}

pub struct FakeNames {
    pub suffix: &'static str,
    pub names: HashMap<String, String>,
    /// address -> primary name
    pub reverse: HashMap<String, String>,
    pub avatars: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl FakeNames {
    pub fn new(suffix: &'static str, names: &[(&str, &str)]) -> Self {
        Self {
            suffix,
            names: names.iter().map(|(n, a)| (n.to_string(), a.to_string())).collect(),
            reverse: HashMap::new(),
            avatars: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_primary(mut self, address: &str, name: &str, avatar: Option<&str>) -> Self {
        self.reverse.insert(address.to_string(), name.to_string());
        if let Some(avatar) = avatar {
            self.avatars.insert(name.to_string(), avatar.to_string());
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NameRegistry for FakeNames {
    fn handles(&self, name: &str) -> bool {
        name.ends_with(self.suffix)
    }

    async fn resolve_name(&self, name: &str) -> Result<Option<String>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.names.get(name).cloned())
    }

    async fn reverse_name(&self, address: &str) -> Result<Option<String>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reverse.get(address).cloned())
    }

    async fn avatar(&self, name: &str) -> Result<Option<String>, SourceError> {
        Ok(self.avatars.get(name).cloned())
    }

    fn registry_name(&self) -> &'static str {
        "FakeNames"
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    pub coins: HashMap<String, CreatorCoinNode>,
    pub profiles: HashMap<String, CreatorProfile>,
    /// Lists missing from the map fail.
    pub lists: HashMap<ExploreList, Vec<CreatorCoinNode>>,
    pub metadata: HashMap<String, CreatorTokenMetadata>,
    /// Makes every explore list fail while set.
    pub explore_down: AtomicBool,
    pub explore_calls: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeRegistry {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn explore_calls(&self) -> usize {
        self.explore_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CreatorRegistry for FakeRegistry {
    async fn coin(&self, address: &str) -> Result<Option<CreatorCoinNode>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.coins.get(address).cloned())
    }

    async fn profile(&self, identifier: &str) -> Result<Option<CreatorProfile>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.profiles.get(&identifier.to_lowercase()).cloned())
    }

    async fn explore(&self, list: ExploreList, count: usize) -> Result<Vec<CreatorCoinNode>, SourceError> {
        self.explore_calls.fetch_add(1, Ordering::SeqCst);
        if self.explore_down.load(Ordering::SeqCst) {
            return Err(down(list.list_type()));
        }
        match self.lists.get(&list) {
            Some(nodes) => Ok(nodes.iter().take(count).cloned().collect()),
            None => Err(down(list.list_type())),
        }
    }

    async fn token_metadata(&self, address: &str) -> Result<Option<CreatorTokenMetadata>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.metadata.get(address).cloned())
    }
}

pub struct FakeHoldings {
    pub name: &'static str,
    /// `None` makes the source fail.
    pub balances: Option<Vec<HoldingBalance>>,
    pub calls: AtomicUsize,
}

impl FakeHoldings {
    pub fn new(name: &'static str, balances: Option<Vec<HoldingBalance>>) -> Self {
        Self {
            name,
            balances,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HoldingsSource for FakeHoldings {
    async fn balances(&self, _chain: Chain, _owner: &str) -> Result<Vec<HoldingBalance>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.balances.clone().ok_or_else(|| down(self.name))
    }

    fn source_name(&self) -> &'static str {
        self.name
    }
}

pub fn holding(address: Option<&str>, symbol: &str, decimals: u8, raw: u128) -> HoldingBalance {
    HoldingBalance {
        address: address.map(str::to_string),
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        decimals,
        image: None,
        balance_raw: U256::from(raw),
    }
}

/// Every adapter behind a resolver, kept as concrete fakes so tests can read
/// call counters.
pub struct Fakes {
    pub market: Arc<FakeMarket>,
    pub pairs: Arc<FakePairs>,
    pub onchain: Arc<FakeOnchain>,
    pub registry: Arc<FakeRegistry>,
    pub basenames: Arc<FakeNames>,
    pub ens: Arc<FakeNames>,
}

impl Fakes {
    pub fn new(market: FakeMarket, pairs: FakePairs, onchain: FakeOnchain, registry: FakeRegistry) -> Self {
        Self {
            market: Arc::new(market),
            pairs: Arc::new(pairs),
            onchain: Arc::new(onchain),
            registry: Arc::new(registry),
            basenames: Arc::new(FakeNames::new(".base.eth", &[])),
            ens: Arc::new(FakeNames::new(".eth", &[])),
        }
    }

    pub fn with_names(mut self, basenames: FakeNames, ens: FakeNames) -> Self {
        self.basenames = Arc::new(basenames);
        self.ens = Arc::new(ens);
        self
    }

    pub fn sources(&self) -> ResolverSources {
        ResolverSources {
            market: self.market.clone(),
            pairs: self.pairs.clone(),
            onchain: self.onchain.clone(),
            registry: self.registry.clone(),
            names: vec![self.basenames.clone() as Arc<dyn NameRegistry>, self.ens.clone()],
        }
    }

    pub fn resolver(&self, clock: &ManualClock) -> TokenResolver {
        let config = ResolverConfig {
            cache_ttl: Duration::from_secs(60),
            ..ResolverConfig::default()
        };
        TokenResolver::with_clock(config, self.sources(), Arc::new(clock.clone()))
    }

    pub fn total_calls(&self) -> usize {
        self.market.calls() + self.pairs.calls() + self.onchain.calls() + self.registry.calls()
    }
}
