use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::HttpSourceConfig;
use crate::sources::utils::{dexscreener_cdn_image, fetch_json, ImageCandidates, TokenUtils};
use crate::sources::{PairSource, SourceError};
use crate::types::{Chain, TokenData};

const SOURCE: &str = "DexScreener";

/// Upper bound on addresses per `/latest/dex/tokens` call.
pub const MAX_ADDRESSES_PER_CALL: usize = 30;

#[derive(Debug, Deserialize)]
struct PairsResponse {
    #[serde(default)]
    pairs: Option<Vec<DexPair>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPair {
    #[serde(default)]
    pub chain_id: String,
    #[serde(default)]
    pub dex_id: String,
    #[serde(default)]
    pub pair_address: String,
    pub base_token: PairToken,
    #[serde(default)]
    pub quote_token: Option<PairToken>,
    #[serde(default)]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub fdv: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub liquidity: Option<PairLiquidity>,
    #[serde(default)]
    pub info: Option<PairInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairToken {
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairLiquidity {
    #[serde(default)]
    pub usd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairInfo {
    #[serde(default)]
    pub image_url: Option<String>,
}

impl DexPair {
    pub fn price_usd(&self) -> f64 {
        self.price_usd
            .as_deref()
            .map(TokenUtils::parse_decimal_or_zero)
            .unwrap_or(0.0)
    }

    /// Fully diluted valuation when reported, otherwise the market cap field.
    pub fn market_cap_usd(&self) -> f64 {
        self.fdv
            .filter(|v| v.is_finite() && *v > 0.0)
            .or(self.market_cap)
            .map(TokenUtils::finite_or_zero)
            .unwrap_or(0.0)
    }

    pub fn liquidity_usd(&self) -> f64 {
        self.liquidity
            .as_ref()
            .and_then(|l| l.usd)
            .map(TokenUtils::finite_or_zero)
            .unwrap_or(0.0)
    }

    pub fn image_url(&self) -> Option<String> {
        let url = self.info.as_ref().and_then(|i| i.image_url.clone());
        ImageCandidates::full(url).resolve()
    }

    pub fn base_address(&self) -> String {
        TokenUtils::normalize_address(&self.base_token.address)
    }

    /// Token record built from this pair's base token.
    pub fn to_token_data(&self, chain: Chain) -> TokenData {
        let address = self.base_address();
        let mut token = TokenData::new(
            address.clone(),
            self.base_token.symbol.clone(),
            self.base_token.name.clone(),
        );
        token.current_price = self.price_usd();
        token.market_cap = self.market_cap_usd();
        token.image = self
            .image_url()
            .or_else(|| Some(dexscreener_cdn_image(chain, &address)));
        token.address = Some(address);
        token.normalized()
    }
}

/// Most liquid pair whose base token is `address`.
pub fn most_liquid_pair<'a>(pairs: &'a [DexPair], address: &str) -> Option<&'a DexPair> {
    let address = TokenUtils::normalize_address(address);
    pairs
        .iter()
        .filter(|pair| pair.base_address() == address)
        .max_by(|a, b| {
            a.liquidity_usd()
                .partial_cmp(&b.liquidity_usd())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

pub struct DexScreenerSource {
    client: Client,
    config: HttpSourceConfig,
}

impl DexScreenerSource {
    pub fn new(config: HttpSourceConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl PairSource for DexScreenerSource {
    async fn pairs_for_tokens(&self, addresses: &[String]) -> Result<Vec<DexPair>, SourceError> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        if addresses.len() > MAX_ADDRESSES_PER_CALL {
            return Err(SourceError::InvalidIdentifier(format!(
                "{} addresses requested, at most {} per call",
                addresses.len(),
                MAX_ADDRESSES_PER_CALL
            )));
        }

        let joined = addresses
            .iter()
            .map(|a| TokenUtils::normalize_address(a))
            .collect::<Vec<_>>()
            .join(",");
        let url = format!(
            "{}/latest/dex/tokens/{}",
            self.config.base_url.trim_end_matches('/'),
            joined
        );

        let response: PairsResponse =
            fetch_json(self.client.get(url).timeout(self.config.timeout), SOURCE).await?;
        let pairs = response.pairs.unwrap_or_default();
        debug!("{} returned {} pairs for {} tokens", SOURCE, pairs.len(), addresses.len());
        Ok(pairs)
    }

    fn source_name(&self) -> &'static str {
        SOURCE
    }
}
