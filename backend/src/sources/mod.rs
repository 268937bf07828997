// Upstream data sources
pub mod utils;

pub mod blockscout;
pub mod coingecko;
pub mod creator_registry;
pub mod dexscreener;
pub mod names;
pub mod onchain;
pub mod portfolio;

pub use blockscout::BlockscoutSource;
pub use coingecko::CoinGeckoSource;
pub use creator_registry::{CreatorCoinNode, CreatorProfile, CreatorTokenMetadata, ExploreList, ZoraRegistrySource};
pub use dexscreener::{DexPair, DexScreenerSource};
pub use names::RegistryNameResolver;
pub use onchain::{AlloyOnchainReader, OnchainTokenMetadata};
pub use portfolio::PortfolioApiSource;

use crate::types::{Chain, TokenData};
use alloy::primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use utils::*;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),
    #[error("Unexpected response shape: {0}")]
    SchemaMismatch(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Contract call failed: {0}")]
    Contract(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::SchemaMismatch(err.to_string())
        } else if err.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            SourceError::NotFound(err.to_string())
        } else {
            SourceError::Unavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::SchemaMismatch(err.to_string())
    }
}

/// One autocomplete hit from the market data search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSearchHit {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub market_cap_rank: u32,
}

/// A raw wallet balance as reported by a portfolio or explorer source.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingBalance {
    pub address: Option<String>,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub image: Option<String>,
    pub balance_raw: U256,
}

/// Market data aggregator (coins by id, by contract, search, top lists).
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn markets_by_ids(&self, ids: &[String]) -> Result<Vec<TokenData>, SourceError>;
    async fn token_by_contract(&self, chain: Chain, address: &str) -> Result<Option<TokenData>, SourceError>;
    async fn search(&self, query: &str) -> Result<Vec<MarketSearchHit>, SourceError>;
    async fn top_markets(&self, per_page: usize) -> Result<Vec<TokenData>, SourceError>;
    fn source_name(&self) -> &'static str;
}

/// DEX pair lookup keyed by token contract address.
#[async_trait]
pub trait PairSource: Send + Sync {
    async fn pairs_for_tokens(&self, addresses: &[String]) -> Result<Vec<DexPair>, SourceError>;
    fn source_name(&self) -> &'static str;
}

#[async_trait]
pub trait OnchainReader: Send + Sync {
    /// Batched ERC-20 metadata read. Individual fields are `None` when that
    /// call reverted.
    async fn token_metadata(&self, chain: Chain, address: &str) -> Result<OnchainTokenMetadata, SourceError>;
    async fn native_balance(&self, chain: Chain, owner: &str) -> Result<U256, SourceError>;
}

#[async_trait]
pub trait NameRegistry: Send + Sync {
    /// Whether this registry is responsible for `name`.
    fn handles(&self, name: &str) -> bool;
    async fn resolve_name(&self, name: &str) -> Result<Option<String>, SourceError>;

    /// Primary name for `address`, verified against its forward record.
    /// Registries without reverse records return `Ok(None)`.
    async fn reverse_name(&self, _address: &str) -> Result<Option<String>, SourceError> {
        Ok(None)
    }

    /// Avatar image URL published for `name`.
    async fn avatar(&self, _name: &str) -> Result<Option<String>, SourceError> {
        Ok(None)
    }

    fn registry_name(&self) -> &'static str;
}

/// Creator-token registry: coins, profiles, explore lists and token metadata.
#[async_trait]
pub trait CreatorRegistry: Send + Sync {
    async fn coin(&self, address: &str) -> Result<Option<CreatorCoinNode>, SourceError>;
    async fn profile(&self, identifier: &str) -> Result<Option<CreatorProfile>, SourceError>;
    async fn explore(&self, list: ExploreList, count: usize) -> Result<Vec<CreatorCoinNode>, SourceError>;
    async fn token_metadata(&self, address: &str) -> Result<Option<CreatorTokenMetadata>, SourceError>;
}

/// Token balances held by a wallet.
#[async_trait]
pub trait HoldingsSource: Send + Sync {
    async fn balances(&self, chain: Chain, owner: &str) -> Result<Vec<HoldingBalance>, SourceError>;
    fn source_name(&self) -> &'static str;
}
