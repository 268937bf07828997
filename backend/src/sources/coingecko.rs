use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::HttpSourceConfig;
use crate::sources::utils::{fetch_json, lenient_f64, ImageCandidates, TokenUtils};
use crate::sources::{MarketDataSource, MarketSearchHit, SourceError};
use crate::types::{Chain, TokenData};

const SOURCE: &str = "CoinGecko";
pub const SEARCH_RESULT_LIMIT: usize = 5;

/// CoinGecko v3 market data client.
pub struct CoinGeckoSource {
    client: Client,
    config: HttpSourceConfig,
}

#[derive(Debug, Deserialize)]
struct MarketRow {
    id: String,
    symbol: String,
    name: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    current_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    market_cap: Option<f64>,
    #[serde(default)]
    market_cap_rank: Option<u32>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price_change_percentage_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    ath: Option<f64>,
}

impl From<MarketRow> for TokenData {
    fn from(row: MarketRow) -> Self {
        let mut token = TokenData::new(row.id, row.symbol, row.name);
        token.image = ImageCandidates::full(row.image).resolve();
        token.current_price = row.current_price.unwrap_or(0.0);
        token.market_cap = row.market_cap.unwrap_or(0.0);
        token.market_cap_rank = row.market_cap_rank.unwrap_or(0);
        token.price_change_percentage_24h = row.price_change_percentage_24h.unwrap_or(0.0);
        token.ath = row.ath.unwrap_or(0.0);
        token.normalized()
    }
}

#[derive(Debug, Deserialize)]
struct ContractCoin {
    id: String,
    symbol: String,
    name: String,
    #[serde(default)]
    image: Option<CoinImage>,
    #[serde(default)]
    market_cap_rank: Option<u32>,
    #[serde(default)]
    market_data: Option<ContractMarketData>,
    #[serde(default)]
    detail_platforms: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct CoinImage {
    thumb: Option<String>,
    small: Option<String>,
    large: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UsdQuote {
    #[serde(default, deserialize_with = "lenient_f64")]
    usd: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ContractMarketData {
    #[serde(default)]
    current_price: UsdQuote,
    #[serde(default)]
    market_cap: UsdQuote,
    #[serde(default)]
    ath: UsdQuote,
    #[serde(default, deserialize_with = "lenient_f64")]
    price_change_percentage_24h: Option<f64>,
}

impl ContractCoin {
    fn decimals_on(&self, platform: &str) -> Option<u8> {
        self.detail_platforms
            .as_ref()?
            .get(platform)?
            .get("decimal_place")?
            .as_u64()
            .and_then(|d| u8::try_from(d).ok())
    }

    fn into_token(self, address: &str, platform: &str) -> TokenData {
        let decimals = self.decimals_on(platform);
        let image = self.image.unwrap_or_default();
        let market = self.market_data.unwrap_or_default();

        let mut token = TokenData::new(self.id, self.symbol, self.name);
        token.image = ImageCandidates {
            preview: None,
            full: image.large,
            thumb: image.thumb,
            small: image.small,
        }
        .resolve();
        token.current_price = market.current_price.usd.unwrap_or(0.0);
        token.market_cap = market.market_cap.usd.unwrap_or(0.0);
        token.ath = market.ath.usd.unwrap_or(0.0);
        token.price_change_percentage_24h = market.price_change_percentage_24h.unwrap_or(0.0);
        token.market_cap_rank = self.market_cap_rank.unwrap_or(0);
        token.address = Some(TokenUtils::normalize_address(address));
        if let Some(decimals) = decimals {
            token.decimals = decimals;
        }
        token.normalized()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<SearchCoin>,
}

#[derive(Debug, Deserialize)]
struct SearchCoin {
    id: String,
    name: String,
    symbol: String,
    #[serde(default)]
    market_cap_rank: Option<u32>,
    #[serde(default)]
    thumb: Option<String>,
    #[serde(default)]
    large: Option<String>,
}

impl CoinGeckoSource {
    pub fn new(config: HttpSourceConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let mut request = self.client.get(url).timeout(self.config.timeout);
        if let Some(key) = &self.config.api_key {
            let header = if self.config.base_url.contains("pro-api") {
                "x-cg-pro-api-key"
            } else {
                "x-cg-demo-api-key"
            };
            request = request.header(header, key);
        }
        request
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoSource {
    async fn markets_by_ids(&self, ids: &[String]) -> Result<Vec<TokenData>, SourceError> {
        let ids: Vec<String> = ids
            .iter()
            .map(|id| id.trim().to_lowercase())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let request = self
            .get("/coins/markets")
            .query(&[("vs_currency", "usd"), ("ids", ids.join(",").as_str())]);
        let rows: Vec<MarketRow> = fetch_json(request, SOURCE).await?;
        debug!("{} returned {} market rows for {:?}", SOURCE, rows.len(), ids);
        Ok(rows.into_iter().map(TokenData::from).collect())
    }

    async fn token_by_contract(&self, chain: Chain, address: &str) -> Result<Option<TokenData>, SourceError> {
        if !TokenUtils::is_valid_address(address) {
            return Err(SourceError::InvalidIdentifier(address.to_string()));
        }

        let platform = chain.market_platform();
        let path = format!("/coins/{}/contract/{}", platform, TokenUtils::normalize_address(address));
        match fetch_json::<ContractCoin>(self.get(&path), SOURCE).await {
            Ok(coin) => Ok(Some(coin.into_token(address, platform))),
            Err(SourceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<MarketSearchHit>, SourceError> {
        let query = query.trim();
        if query.chars().count() < 2 {
            return Ok(Vec::new());
        }

        let request = self.get("/search").query(&[("query", query)]);
        let response: SearchResponse = fetch_json(request, SOURCE).await?;
        Ok(response
            .coins
            .into_iter()
            .take(SEARCH_RESULT_LIMIT)
            .map(|coin| MarketSearchHit {
                image: ImageCandidates {
                    full: coin.large,
                    thumb: coin.thumb,
                    ..ImageCandidates::default()
                }
                .resolve(),
                id: coin.id,
                symbol: coin.symbol,
                name: coin.name,
                market_cap_rank: coin.market_cap_rank.unwrap_or(0),
            })
            .collect())
    }

    async fn top_markets(&self, per_page: usize) -> Result<Vec<TokenData>, SourceError> {
        let per_page = per_page.clamp(1, 250).to_string();
        let request = self.get("/coins/markets").query(&[
            ("vs_currency", "usd"),
            ("order", "market_cap_desc"),
            ("per_page", per_page.as_str()),
            ("page", "1"),
            ("sparkline", "false"),
        ]);
        let rows: Vec<MarketRow> = fetch_json(request, SOURCE).await?;
        info!("✅ {} top markets loaded: {} rows", SOURCE, rows.len());
        Ok(rows.into_iter().map(TokenData::from).collect())
    }

    fn source_name(&self) -> &'static str {
        SOURCE
    }
}
