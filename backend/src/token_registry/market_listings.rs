use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::cache::{Clock, QueryCache, SystemClock};
use crate::sources::{MarketDataSource, MarketSearchHit};
use crate::types::TokenData;

const STABLECOINS: &[&str] = &["usdc", "usdt", "dai", "tusd", "fdusd"];
const MIN_QUERY_LEN: usize = 2;
const MAX_TOP_LIMIT: usize = 250;

#[derive(Debug, Clone)]
pub struct ListingsConfig {
    pub top_limit: usize,
    pub top_ttl: Duration,
    pub search_ttl: Duration,
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            top_limit: 100,
            top_ttl: Duration::from_secs(300),
            search_ttl: Duration::from_secs(300),
        }
    }
}

pub fn is_stablecoin(symbol: &str) -> bool {
    STABLECOINS.contains(&symbol.to_lowercase().as_str())
}

/// Served when the market service is down or throttled.
static FALLBACK_TOKENS: Lazy<Vec<TokenData>> = Lazy::new(|| {
    [
        ("bitcoin", "btc", "Bitcoin", 95_000.0, 1.8e12, 1, "https://assets.coingecko.com/coins/images/1/large/bitcoin.png"),
        ("ethereum", "eth", "Ethereum", 2_600.0, 3.1e11, 2, "https://assets.coingecko.com/coins/images/279/large/ethereum.png"),
        ("solana", "sol", "Solana", 180.0, 8.5e10, 5, "https://assets.coingecko.com/coins/images/4128/large/solana.png"),
        ("binancecoin", "bnb", "BNB", 600.0, 8.8e10, 4, "https://assets.coingecko.com/coins/images/825/large/binance-coin.png"),
        ("ripple", "xrp", "XRP", 2.50, 1.4e11, 3, "https://assets.coingecko.com/coins/images/44/large/xrp.png"),
    ]
    .into_iter()
    .map(|(id, symbol, name, price, market_cap, rank, image)| {
        let mut token = TokenData::new(id, symbol, name);
        token.current_price = price;
        token.market_cap = market_cap;
        token.market_cap_rank = rank;
        token.image = Some(image.to_string());
        token
    })
    .collect()
});

pub fn fallback_tokens() -> Vec<TokenData> {
    FALLBACK_TOKENS.clone()
}

/// Top market-cap listing and free-text market search.
pub struct MarketListings {
    config: ListingsConfig,
    market: Arc<dyn MarketDataSource>,
    top_cache: QueryCache<usize, Option<Vec<TokenData>>>,
    search_cache: QueryCache<String, Option<Vec<MarketSearchHit>>>,
}

impl MarketListings {
    pub fn new(config: ListingsConfig, market: Arc<dyn MarketDataSource>) -> Self {
        Self::with_clock(config, market, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ListingsConfig, market: Arc<dyn MarketDataSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            top_cache: QueryCache::with_clock("top-markets", config.top_ttl, Arc::clone(&clock)),
            search_cache: QueryCache::with_clock("market-search", config.search_ttl, clock),
            config,
            market,
        }
    }

    /// Top coins by market cap without stablecoins. Falls back to a static
    /// list (never cached) when the market service fails.
    pub async fn top(&self, limit: Option<usize>) -> Vec<TokenData> {
        let limit = limit.unwrap_or(self.config.top_limit).clamp(1, MAX_TOP_LIMIT);
        let market = Arc::clone(&self.market);

        let fetched = self
            .top_cache
            .get_or_fetch_if(
                limit,
                move || async move {
                    match market.top_markets(limit).await {
                        Ok(tokens) => Some(tokens.into_iter().filter(|t| !is_stablecoin(&t.symbol)).collect::<Vec<_>>()),
                        Err(e) => {
                            error!("❌ Top markets from {} failed: {}", market.source_name(), e);
                            None
                        }
                    }
                },
                |tokens| tokens.is_some(),
            )
            .await;

        match fetched {
            Some(tokens) => tokens,
            None => {
                info!("Serving static top-token fallback");
                fallback_tokens()
            }
        }
    }

    /// Market search for autocomplete. Queries shorter than two characters
    /// return nothing.
    pub async fn search(&self, query: &str) -> Vec<MarketSearchHit> {
        let query = query.trim().to_string();
        if query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }
        let market = Arc::clone(&self.market);
        let key = query.to_lowercase();

        self.search_cache
            .get_or_fetch_if(
                key,
                move || async move {
                    match market.search(&query).await {
                        Ok(hits) => Some(hits),
                        Err(e) => {
                            error!("❌ Market search for {:?} failed: {}", query, e);
                            None
                        }
                    }
                },
                |hits| hits.is_some(),
            )
            .await
            .unwrap_or_default()
    }
}
