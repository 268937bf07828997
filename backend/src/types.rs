use alloy::primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Decimals assumed for any token that did not come from an on-chain read.
pub const DEFAULT_DECIMALS: u8 = 18;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Base,
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Base => "base",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Base => 8453,
        }
    }

    /// Asset platform slug used by the market data service.
    pub fn market_platform(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Base => "base",
        }
    }

    /// Wrapped native token, used as the price proxy for the native asset.
    pub fn wrapped_native(&self) -> &'static str {
        match self {
            Chain::Ethereum => "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
            Chain::Base => "0x4200000000000000000000000000000000000006",
        }
    }

    pub fn native_symbol(&self) -> &'static str {
        "ETH"
    }

    pub fn native_name(&self) -> &'static str {
        match self {
            Chain::Ethereum => "Ether",
            Chain::Base => "Ethereum",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ethereum" | "eth" | "mainnet" => Ok(Chain::Ethereum),
            "base" => Ok(Chain::Base),
            other => Err(format!("unsupported chain: {}", other)),
        }
    }
}

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

/// Canonical token record every source is normalized into.
///
/// Numeric fields use `0` as the "unknown" sentinel. Records are built once
/// per fetch and never mutated afterwards; call [`TokenData::normalized`]
/// before handing a freshly assembled record out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenData {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default)]
    pub market_cap_rank: u32,
    #[serde(default)]
    pub price_change_percentage_24h: f64,
    #[serde(default)]
    pub ath: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<CreatorInfo>,
}

impl TokenData {
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            image: None,
            current_price: 0.0,
            market_cap: 0.0,
            market_cap_rank: 0,
            price_change_percentage_24h: 0.0,
            ath: 0.0,
            address: None,
            decimals: DEFAULT_DECIMALS,
            creator_address: None,
            creator: None,
        }
    }

    /// Clamp prices and market cap to finite non-negative values and drop
    /// blank optional strings.
    pub fn normalized(mut self) -> Self {
        self.current_price = non_negative(self.current_price);
        self.market_cap = non_negative(self.market_cap);
        self.ath = non_negative(self.ath);
        if !self.price_change_percentage_24h.is_finite() {
            self.price_change_percentage_24h = 0.0;
        }
        self.image = self.image.filter(|s| !s.trim().is_empty());
        self.address = self
            .address
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_lowercase());
        self.creator_address = self.creator_address.filter(|s| !s.trim().is_empty());
        self
    }

    /// A record is usable when it carries a non-empty symbol.
    pub fn is_valid(&self) -> bool {
        !self.symbol.trim().is_empty()
    }

    /// True when the record can act as a valuation denominator.
    pub fn has_market_cap(&self) -> bool {
        self.market_cap > 0.0
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Display identity of the account behind a creator coin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorInfo {
    /// Primary ENS name, or the shortened owner address without one.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ens: Option<String>,
}

impl CreatorInfo {
    pub fn from_ens(address: &str, ens: Option<String>, avatar: Option<String>) -> Self {
        Self {
            name: ens.clone().unwrap_or_else(|| short_address(address)),
            avatar,
            ens,
        }
    }
}

/// `0x1234...abcd`
pub fn short_address(address: &str) -> String {
    let address = address.trim();
    if address.len() <= 10 || !address.is_char_boundary(6) || !address.is_char_boundary(address.len() - 4) {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// A holding in a connected wallet, priced in USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletToken {
    #[serde(flatten)]
    pub token: TokenData,
    /// Human-readable balance (raw / 10^decimals).
    pub balance: String,
    #[serde(serialize_with = "serialize_u256", deserialize_with = "deserialize_u256")]
    pub balance_raw: U256,
    pub value_usd: f64,
}

impl WalletToken {
    /// Key used to de-duplicate holdings reported by several sources.
    pub fn dedupe_key(&self) -> String {
        match &self.token.address {
            Some(address) => address.to_lowercase(),
            None => self.token.symbol.to_lowercase(),
        }
    }
}

/// Lightweight creator-coin listing entry used for local matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryCandidate {
    pub address: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub market_cap: Option<f64>,
}

impl DiscoveryCandidate {
    /// Case-insensitive prefix match on name or symbol.
    pub fn matches_prefix(&self, query_lower: &str) -> bool {
        self.name.to_lowercase().starts_with(query_lower) || self.symbol.to_lowercase().starts_with(query_lower)
    }
}

fn serialize_u256<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn deserialize_u256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    let raw = String::deserialize(deserializer)?;
    U256::from_str_radix(raw.trim(), 10).map_err(serde::de::Error::custom)
}
