use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::HttpSourceConfig;
use crate::sources::utils::{fetch_json, ImageCandidates, TokenUtils};
use crate::sources::{HoldingBalance, HoldingsSource, SourceError};
use crate::types::{Chain, DEFAULT_DECIMALS};

const SOURCE: &str = "Portfolio";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<PortfolioResult>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct PortfolioResult {
    #[serde(default)]
    portfolios: Vec<Portfolio>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Portfolio {
    #[serde(default)]
    token_balances: Vec<TokenBalance>,
}

#[derive(Debug, Deserialize)]
struct TokenBalance {
    token: PortfolioToken,
    #[serde(default)]
    balance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortfolioToken {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    chain_id: Option<u64>,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    decimals: Option<u8>,
    #[serde(default)]
    image: Option<String>,
}

impl TokenBalance {
    fn into_holding(self) -> Option<HoldingBalance> {
        let balance_raw = TokenUtils::parse_raw_amount(&self.balance)?;
        let address = self
            .token
            .address
            .filter(|a| TokenUtils::is_valid_address(a))
            .map(|a| TokenUtils::normalize_address(&a));
        Some(HoldingBalance {
            address,
            symbol: self.token.symbol,
            name: self.token.name,
            decimals: self.token.decimals.unwrap_or(DEFAULT_DECIMALS),
            image: ImageCandidates::full(self.token.image).resolve(),
            balance_raw,
        })
    }
}

/// Wallet portfolio from the Coinbase developer platform JSON-RPC API.
pub struct PortfolioApiSource {
    client: Client,
    config: HttpSourceConfig,
}

impl PortfolioApiSource {
    pub fn new(config: HttpSourceConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match &self.config.api_key {
            Some(key) => format!("{}/{}", base, key),
            None => base.to_string(),
        }
    }
}

#[async_trait]
impl HoldingsSource for PortfolioApiSource {
    async fn balances(&self, chain: Chain, owner: &str) -> Result<Vec<HoldingBalance>, SourceError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "cdp_getTokensForAddresses",
            "params": [{ "addresses": [owner] }]
        });
        let request = self
            .client
            .post(self.endpoint())
            .timeout(self.config.timeout)
            .json(&body);

        let response: RpcResponse = fetch_json(request, SOURCE).await?;
        if let Some(error) = response.error {
            return Err(SourceError::Unavailable(format!("{} RPC error: {}", SOURCE, error.message)));
        }
        let result = response
            .result
            .ok_or_else(|| SourceError::SchemaMismatch(format!("{} response has no result", SOURCE)))?;

        let holdings: Vec<HoldingBalance> = result
            .portfolios
            .into_iter()
            .take(1)
            .flat_map(|p| p.token_balances)
            .filter(|b| b.token.chain_id.map_or(true, |id| id == chain.chain_id()))
            .filter_map(TokenBalance::into_holding)
            .collect();
        debug!("{} reported {} balances for {}", SOURCE, holdings.len(), owner);
        Ok(holdings)
    }

    fn source_name(&self) -> &'static str {
        SOURCE
    }
}
