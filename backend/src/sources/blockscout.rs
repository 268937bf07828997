use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::HttpSourceConfig;
use crate::sources::utils::{fetch_json, ImageCandidates, TokenUtils};
use crate::sources::{HoldingBalance, HoldingsSource, SourceError};
use crate::types::{Chain, DEFAULT_DECIMALS};

const SOURCE: &str = "Blockscout";

#[derive(Debug, Deserialize)]
struct TokenListResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenListItem {
    #[serde(default)]
    balance: String,
    contract_address: String,
    #[serde(default)]
    decimals: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
    #[serde(default, rename = "type")]
    token_type: Option<String>,
    #[serde(default, rename = "logoURI")]
    logo_uri: Option<String>,
}

impl TokenListItem {
    fn is_fungible(&self) -> bool {
        self.token_type
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case("ERC-20"))
            .unwrap_or(true)
    }

    fn into_holding(self) -> Option<HoldingBalance> {
        if !TokenUtils::is_valid_address(&self.contract_address) {
            return None;
        }
        let balance_raw = TokenUtils::parse_raw_amount(&self.balance)?;
        Some(HoldingBalance {
            address: Some(TokenUtils::normalize_address(&self.contract_address)),
            symbol: self.symbol,
            name: self.name,
            decimals: self.decimals.trim().parse().unwrap_or(DEFAULT_DECIMALS),
            image: ImageCandidates::full(self.logo_uri).resolve(),
            balance_raw,
        })
    }
}

/// Token list from a Blockscout explorer (`module=account&action=tokenlist`).
pub struct BlockscoutSource {
    client: Client,
    config: HttpSourceConfig,
}

impl BlockscoutSource {
    pub fn new(config: HttpSourceConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl HoldingsSource for BlockscoutSource {
    async fn balances(&self, _chain: Chain, owner: &str) -> Result<Vec<HoldingBalance>, SourceError> {
        let url = format!("{}/api", self.config.base_url.trim_end_matches('/'));
        let request = self
            .client
            .get(url)
            .timeout(self.config.timeout)
            .query(&[("module", "account"), ("action", "tokenlist"), ("address", owner)]);

        let response: TokenListResponse = fetch_json(request, SOURCE).await?;
        let items = match response.result {
            Value::Array(items) => items,
            other => {
                // "No tokens found" comes back as status 0 with a string result
                debug!(
                    "{} returned no token list (status={:?}, message={:?}, result={})",
                    SOURCE, response.status, response.message, other
                );
                return Ok(Vec::new());
            }
        };

        let mut holdings = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<TokenListItem>(item) {
                Ok(item) if item.is_fungible() => holdings.extend(item.into_holding()),
                Ok(_) => {}
                Err(e) => warn!("Skipping malformed {} token entry: {}", SOURCE, e),
            }
        }
        Ok(holdings)
    }

    fn source_name(&self) -> &'static str {
        SOURCE
    }
}
