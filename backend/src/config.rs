use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::resolver::ResolverConfig;
use crate::token_registry::{DiscoveryConfig, ListingsConfig};
use crate::types::Chain;
use crate::wallet::WalletConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Base URL, optional key and timeout for one HTTP upstream.
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl HttpSourceConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub rpc_endpoints: HashMap<Chain, Vec<String>>,
    pub coingecko: HttpSourceConfig,
    pub dexscreener: HttpSourceConfig,
    pub creator_registry: HttpSourceConfig,
    pub portfolio: HttpSourceConfig,
    pub blockscout: HttpSourceConfig,
    pub resolver: ResolverConfig,
    pub discovery: DiscoveryConfig,
    pub listings: ListingsConfig,
    pub wallet: WalletConfig,
}

const DEFAULT_BASE_RPCS: &[&str] = &["https://mainnet.base.org", "https://base.publicnode.com"];
const DEFAULT_ETHEREUM_RPCS: &[&str] = &["https://eth.drpc.org", "https://ethereum.publicnode.com"];

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let http_timeout = secs(&get, "HTTP_TIMEOUT_SECS", 10)?;
        let source = |url_key: &'static str, default: &str, key_key: Option<&'static str>| HttpSourceConfig {
            base_url: get(url_key).unwrap_or_else(|| default.to_string()),
            api_key: key_key.and_then(|k| get(k)),
            timeout: http_timeout,
        };

        let mut rpc_endpoints = HashMap::new();
        rpc_endpoints.insert(Chain::Base, url_list(get("BASE_RPC_URL"), DEFAULT_BASE_RPCS));
        rpc_endpoints.insert(Chain::Ethereum, url_list(get("ETHEREUM_RPC_URL"), DEFAULT_ETHEREUM_RPCS));

        let mut resolver = ResolverConfig {
            cache_ttl: secs(&get, "CACHE_TTL_SECS", 60)?,
            ..ResolverConfig::default()
        };
        if let Some(raw) = get("CREATOR_ALIASES") {
            resolver.aliases.extend(parse_aliases(&raw)?);
        }

        let mut discovery = DiscoveryConfig {
            cache_ttl: resolver.cache_ttl,
            ..DiscoveryConfig::default()
        };
        let refresh = secs(&get, "DISCOVERY_REFRESH_SECS", 0)?;
        discovery.refresh_interval = (!refresh.is_zero()).then_some(refresh);

        let wallet = WalletConfig {
            cache_ttl: secs(&get, "WALLET_CACHE_TTL_SECS", 30)?,
            ..WalletConfig::default()
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            rpc_endpoints,
            coingecko: source("COINGECKO_API_URL", "https://api.coingecko.com/api/v3", Some("COINGECKO_API_KEY")),
            dexscreener: source("DEXSCREENER_API_URL", "https://api.dexscreener.com", None),
            creator_registry: source(
                "CREATOR_REGISTRY_URL",
                "https://api.zora.co/universal/graphql",
                Some("CREATOR_REGISTRY_API_KEY"),
            ),
            portfolio: source(
                "PORTFOLIO_API_URL",
                "https://api.developer.coinbase.com/rpc/v1/base",
                Some("PORTFOLIO_API_KEY"),
            ),
            blockscout: source("BLOCKSCOUT_API_URL", "https://base.blockscout.com", None),
            resolver,
            discovery,
            listings: ListingsConfig::default(),
            wallet,
        })
    }
}

fn secs<G>(get: &G, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                value: raw,
                reason: e.to_string(),
            }),
    }
}

fn url_list(raw: Option<String>, defaults: &[&str]) -> Vec<String> {
    match raw {
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => defaults.iter().map(|s| s.to_string()).collect(),
    }
}

/// `name=0xaddress,name2=0xaddress2`
fn parse_aliases(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut aliases = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, address) = pair.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
            key: "CREATOR_ALIASES",
            value: pair.to_string(),
            reason: "expected name=address".to_string(),
        })?;
        let address = address.trim().to_lowercase();
        if !crate::sources::TokenUtils::is_valid_address(&address) {
            return Err(ConfigError::InvalidValue {
                key: "CREATOR_ALIASES",
                value: pair.to_string(),
                reason: "alias target is not an address".to_string(),
            });
        }
        aliases.insert(name.trim().to_lowercase(), address);
    }
    Ok(aliases)
}
