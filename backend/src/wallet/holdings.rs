use alloy::primitives::U256;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::WalletConfig;
use crate::cache::{CacheStats, Clock, QueryCache, SystemClock};
use crate::sources::utils::{default_logo, dexscreener_cdn_image, TokenUtils};
use crate::sources::{DexPair, HoldingBalance, HoldingsSource, OnchainReader, PairSource, SourceError};
use crate::types::{Chain, TokenData, WalletToken, DEFAULT_DECIMALS};

/// Merges native, portfolio and explorer balances for a wallet and ranks
/// them by USD value.
#[derive(Clone)]
pub struct WalletHoldingsAggregator {
    config: Arc<WalletConfig>,
    onchain: Arc<dyn OnchainReader>,
    /// Balance sources in priority order; earlier sources win on duplicates.
    sources: Vec<Arc<dyn HoldingsSource>>,
    pairs: Arc<dyn PairSource>,
    cache: Arc<QueryCache<String, Vec<WalletToken>>>,
}

#[derive(Default)]
struct PriceBook {
    prices: HashMap<String, f64>,
    images: HashMap<String, String>,
}

impl PriceBook {
    /// First pair seen for an address wins.
    fn record(&mut self, pair: &DexPair) {
        let address = pair.base_address();
        let price = pair.price_usd();
        if price > 0.0 {
            self.prices.entry(address.clone()).or_insert(price);
        }
        if let Some(image) = pair.image_url() {
            self.images.entry(address).or_insert(image);
        }
    }
}

impl WalletHoldingsAggregator {
    pub fn new(
        config: WalletConfig,
        onchain: Arc<dyn OnchainReader>,
        sources: Vec<Arc<dyn HoldingsSource>>,
        pairs: Arc<dyn PairSource>,
    ) -> Self {
        Self::with_clock(config, onchain, sources, pairs, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: WalletConfig,
        onchain: Arc<dyn OnchainReader>,
        sources: Vec<Arc<dyn HoldingsSource>>,
        pairs: Arc<dyn PairSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(QueryCache::with_clock("wallet-holdings", config.cache_ttl, clock));
        Self {
            config: Arc::new(config),
            onchain,
            sources,
            pairs,
            cache,
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Holdings of `owner`, sorted by descending USD value. An invalid
    /// address yields an empty list without touching any source.
    pub async fn load_wallet_tokens(&self, owner: &str) -> Vec<WalletToken> {
        if !TokenUtils::is_valid_address(owner) {
            debug!("Ignoring invalid wallet address {:?}", owner);
            return Vec::new();
        }
        let owner = TokenUtils::normalize_address(owner);
        let this = self.clone();

        self.cache
            .get_or_fetch_if(
                owner.clone(),
                move || async move { this.fetch_holdings(&owner).await },
                |tokens| !tokens.is_empty(),
            )
            .await
    }

    async fn fetch_holdings(&self, owner: &str) -> Vec<WalletToken> {
        let chain = self.config.chain;

        let native = async {
            match self.onchain.native_balance(chain, owner).await {
                Ok(balance) => Some(balance),
                Err(e) => {
                    warn!("Native balance for {} failed: {}", owner, e);
                    None
                }
            }
        };
        let listed = join_all(self.sources.iter().map(|source| async move {
            match source.balances(chain, owner).await {
                Ok(balances) => balances,
                Err(e) => {
                    warn!("{} balances for {} failed: {}", source.source_name(), owner, e);
                    Vec::new()
                }
            }
        }));
        let (native, listed) = tokio::join!(native, listed);

        let mut tokens = Vec::new();
        let mut seen = HashSet::new();
        let native = native.filter(|balance| !balance.is_zero()).map(|balance| native_token(chain, balance));
        let holdings = listed.into_iter().flatten().filter_map(holding_token);

        for token in native.into_iter().chain(holdings) {
            if seen.insert(token.dedupe_key()) {
                tokens.push(token);
            }
        }

        if tokens.is_empty() {
            return tokens;
        }

        let tokens = self.price(tokens).await;
        info!("✅ Loaded {} holdings for {}", tokens.len(), owner);
        tokens
    }

    async fn price(&self, mut tokens: Vec<WalletToken>) -> Vec<WalletToken> {
        let chain = self.config.chain;
        let mut addresses: Vec<String> = Vec::new();
        for token in &tokens {
            let address = price_address(chain, token);
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }

        let chunk_size = self.config.price_chunk_size.max(1);
        let results: Vec<Result<Vec<DexPair>, SourceError>> =
            join_all(addresses.chunks(chunk_size).map(|chunk| self.pairs.pairs_for_tokens(chunk))).await;

        let mut book = PriceBook::default();
        let mut any_priced = false;
        for result in results {
            match result {
                Ok(pairs) => {
                    any_priced = true;
                    pairs.iter().for_each(|pair| book.record(pair));
                }
                Err(e) => warn!("{} pricing chunk failed: {}", self.pairs.source_name(), e),
            }
        }

        for token in tokens.iter_mut() {
            let address = price_address(chain, token);
            let price = book.prices.get(&address).copied().unwrap_or(0.0);
            let balance = TokenUtils::parse_decimal_or_zero(&token.balance);

            token.value_usd = TokenUtils::finite_or_zero(balance * price);
            token.token.current_price = price;
            token.token.image = book
                .images
                .get(&address)
                .cloned()
                .or_else(|| token.token.image.take())
                .or_else(|| default_logo(&token.token.symbol).map(str::to_string))
                .or_else(|| token.token.address.as_deref().map(|a| dexscreener_cdn_image(chain, a)));
        }

        if !any_priced {
            error!("❌ Every pricing chunk failed, returning unsorted holdings");
            return tokens;
        }

        tokens.sort_by(|a, b| b.value_usd.partial_cmp(&a.value_usd).unwrap_or(std::cmp::Ordering::Equal));
        tokens
    }
}

/// Address whose DEX price stands in for `token`. The native asset uses its
/// wrapped counterpart.
fn price_address(chain: Chain, token: &WalletToken) -> String {
    token
        .token
        .address
        .clone()
        .unwrap_or_else(|| chain.wrapped_native().to_string())
}

fn native_token(chain: Chain, balance_raw: U256) -> WalletToken {
    let symbol = chain.native_symbol();
    let token = TokenData::new(symbol.to_lowercase(), symbol, chain.native_name());
    WalletToken {
        token,
        balance: TokenUtils::format_units(balance_raw, DEFAULT_DECIMALS),
        balance_raw,
        value_usd: 0.0,
    }
}

fn holding_token(holding: HoldingBalance) -> Option<WalletToken> {
    if holding.balance_raw.is_zero() {
        return None;
    }
    let address = holding.address.as_deref().map(TokenUtils::normalize_address);
    let id = address.clone().unwrap_or_else(|| holding.symbol.to_lowercase());

    let mut token = TokenData::new(id, holding.symbol, holding.name);
    token.decimals = holding.decimals;
    token.image = holding.image;
    token.address = address;

    Some(WalletToken {
        balance: TokenUtils::format_units(holding.balance_raw, holding.decimals),
        balance_raw: holding.balance_raw,
        token: token.normalized(),
        value_usd: 0.0,
    })
}
