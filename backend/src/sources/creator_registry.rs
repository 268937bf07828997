use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::HttpSourceConfig;
use crate::sources::utils::{fetch_json, lenient_f64, ImageCandidates, TokenUtils};
use crate::sources::{CreatorRegistry, SourceError};
use crate::types::{DiscoveryCandidate, TokenData};

const SOURCE: &str = "Zora";

/// Discriminator value marking a creator coin.
pub const CREATOR_COIN_TYPE: &str = "CREATOR";

const COIN_FIELDS: &str = "address name symbol coinType totalSupply marketCap marketCapDelta24h volume24h \
    tokenPrice { priceInUsdc } creatorAddress creatorProfile { handle } \
    mediaContent { previewImage { small medium } originalUri }";

/// Bulk creator-coin listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExploreList {
    MostValuable,
    New,
    TopVolume,
}

impl ExploreList {
    pub fn list_type(&self) -> &'static str {
        match self {
            ExploreList::MostValuable => "MOST_VALUABLE_CREATORS",
            ExploreList::New => "NEW_CREATORS",
            ExploreList::TopVolume => "TOP_VOLUME_CREATORS_24H",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_in_usdc: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileRef {
    #[serde(default)]
    pub handle: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PreviewImage {
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaContent {
    #[serde(default)]
    pub preview_image: Option<PreviewImage>,
    #[serde(default)]
    pub original_uri: Option<String>,
}

/// A coin as reported by the registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorCoinNode {
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub coin_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_supply: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub market_cap: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub market_cap_delta_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume_24h: Option<f64>,
    #[serde(default)]
    pub token_price: Option<TokenPrice>,
    #[serde(default)]
    pub creator_address: Option<String>,
    #[serde(default)]
    pub creator_profile: Option<ProfileRef>,
    #[serde(default)]
    pub media_content: Option<MediaContent>,
}

impl CreatorCoinNode {
    pub fn is_creator_coin(&self) -> bool {
        self.coin_type
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case(CREATOR_COIN_TYPE))
            .unwrap_or(false)
    }

    pub fn image(&self) -> Option<String> {
        let media = self.media_content.clone().unwrap_or_default();
        let preview = media.preview_image.unwrap_or_default();
        ImageCandidates {
            preview: preview.medium,
            full: media.original_uri,
            thumb: None,
            small: preview.small,
        }
        .resolve()
    }

    /// Quoted USDC price, else market cap spread over total supply.
    pub fn price_usd(&self) -> f64 {
        if let Some(price) = self.token_price.as_ref().and_then(|p| p.price_in_usdc) {
            if price > 0.0 {
                return price;
            }
        }
        match (self.market_cap, self.total_supply) {
            (Some(cap), Some(supply)) if supply > 0.0 => cap / supply,
            _ => 0.0,
        }
    }

    /// 24h change derived from the reported market cap delta.
    pub fn price_change_24h(&self) -> f64 {
        let cap = self.market_cap.unwrap_or(0.0);
        let delta = self.market_cap_delta_24h.unwrap_or(0.0);
        let previous = cap - delta;
        if previous > 0.0 {
            delta / previous * 100.0
        } else {
            0.0
        }
    }

    pub fn to_token_data(&self) -> TokenData {
        let address = TokenUtils::normalize_address(&self.address);
        let mut token = TokenData::new(address.clone(), self.symbol.clone(), self.name.clone());
        token.image = self.image();
        token.current_price = self.price_usd();
        token.market_cap = self.market_cap.unwrap_or(0.0);
        token.price_change_percentage_24h = self.price_change_24h();
        token.address = Some(address);
        token.creator_address = self.creator_address.clone();
        token.normalized()
    }

    pub fn to_candidate(&self) -> DiscoveryCandidate {
        DiscoveryCandidate {
            address: TokenUtils::normalize_address(&self.address),
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            image: self.image(),
            market_cap: self.market_cap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCoin {
    pub address: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub market_cap: Option<f64>,
}

/// A registry profile and the creator coin it owns, if any.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorProfile {
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub creator_coin: Option<ProfileCoin>,
}

/// Collection metadata the registry indexes for a token contract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatorTokenMetadata {
    pub name: Option<String>,
    pub image: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CoinData {
    #[serde(rename = "zora20Token")]
    coin: Option<CreatorCoinNode>,
}

#[derive(Debug, Deserialize)]
struct ProfileData {
    profile: Option<CreatorProfile>,
}

#[derive(Debug, Deserialize)]
struct ExploreData {
    #[serde(rename = "exploreList")]
    explore_list: Option<Edges>,
}

#[derive(Debug, Deserialize)]
struct Edges {
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: CreatorCoinNode,
}

#[derive(Debug, Deserialize)]
struct TokensData {
    tokens: Option<TokenNodes>,
}

#[derive(Debug, Deserialize)]
struct TokenNodes {
    #[serde(default)]
    nodes: Vec<TokenNode>,
}

#[derive(Debug, Deserialize)]
struct TokenNode {
    token: Option<RawTokenMetadata>,
}

#[derive(Debug, Deserialize)]
struct RawTokenMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    image: Option<RawImage>,
    #[serde(default)]
    owner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    #[serde(default)]
    url: Option<String>,
}

/// GraphQL client for the Zora creator-coin registry.
pub struct ZoraRegistrySource {
    client: Client,
    config: HttpSourceConfig,
}

impl ZoraRegistrySource {
    pub fn new(config: HttpSourceConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, SourceError> {
        let mut request = self
            .client
            .post(&self.config.base_url)
            .timeout(self.config.timeout)
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(key) = &self.config.api_key {
            request = request.header("api-key", key);
        }

        let response: GraphQlResponse<T> = fetch_json(request, SOURCE).await?;
        let errors = response.errors.unwrap_or_default();
        match response.data {
            Some(data) => {
                if !errors.is_empty() {
                    debug!("{} returned partial data with {} errors", SOURCE, errors.len());
                }
                Ok(data)
            }
            None => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
                Err(SourceError::SchemaMismatch(format!(
                    "{} query returned no data: {}",
                    SOURCE,
                    messages.join("; ")
                )))
            }
        }
    }
}

#[async_trait]
impl CreatorRegistry for ZoraRegistrySource {
    async fn coin(&self, address: &str) -> Result<Option<CreatorCoinNode>, SourceError> {
        let query = format!(
            "query Coin($address: String!, $chain: Int) {{ zora20Token(address: $address, chain: $chain) {{ {} }} }}",
            COIN_FIELDS
        );
        let data: CoinData = self
            .query(
                &query,
                json!({ "address": TokenUtils::normalize_address(address), "chain": 8453 }),
            )
            .await?;
        Ok(data.coin)
    }

    async fn profile(&self, identifier: &str) -> Result<Option<CreatorProfile>, SourceError> {
        let query = "query Profile($identifier: String!) { profile(identifier: $identifier) { handle creatorCoin { address marketCap } } }";
        let data: ProfileData = self
            .query(query, json!({ "identifier": identifier.trim() }))
            .await?;
        Ok(data.profile)
    }

    async fn explore(&self, list: ExploreList, count: usize) -> Result<Vec<CreatorCoinNode>, SourceError> {
        let query = format!(
            "query Explore($listType: String!, $count: Int) {{ exploreList(listType: $listType, count: $count) {{ edges {{ node {{ {} }} }} }} }}",
            COIN_FIELDS
        );
        let data: ExploreData = self
            .query(&query, json!({ "listType": list.list_type(), "count": count }))
            .await?;
        let nodes: Vec<CreatorCoinNode> = data
            .explore_list
            .map(|list| list.edges.into_iter().map(|edge| edge.node).collect())
            .unwrap_or_default();
        if nodes.is_empty() {
            warn!("{} explore list {} came back empty", SOURCE, list.list_type());
        }
        Ok(nodes)
    }

    async fn token_metadata(&self, address: &str) -> Result<Option<CreatorTokenMetadata>, SourceError> {
        let query = "query TokenMetadata($address: String!) { tokens(networks: [{ network: BASE, chain: BASE_MAINNET }], where: { collectionAddresses: [$address] }, pagination: { limit: 1 }) { nodes { token { name image { url } owner } } } }";
        let data: TokensData = self
            .query(query, json!({ "address": TokenUtils::normalize_address(address) }))
            .await?;

        let token = data
            .tokens
            .and_then(|t| t.nodes.into_iter().find_map(|node| node.token));
        Ok(token.map(|raw| CreatorTokenMetadata {
            name: raw.name,
            image: ImageCandidates::full(raw.image.and_then(|i| i.url)).resolve(),
            owner: raw.owner.filter(|o| !TokenUtils::is_zero_address(o) && !o.trim().is_empty()),
        }))
    }
}
