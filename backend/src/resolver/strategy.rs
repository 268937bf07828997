use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sources::SourceError;

/// One pending lookup in a fallback chain.
pub type Attempt<'a, T> = BoxFuture<'a, Result<Option<T>, SourceError>>;

/// Strategies for a well-formed contract address, in default order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressStrategy {
    /// Registry coin lookup, accepted only for creator coins.
    CreatorRegistry,
    /// Multicall + DEX price + registry metadata aggregation.
    CreatorCoin,
    /// Market data by contract on the configured platform.
    MarketByContract,
    /// Most liquid DEX pair.
    DexPair,
}

impl AddressStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            AddressStrategy::CreatorRegistry => "creator-registry",
            AddressStrategy::CreatorCoin => "creator-coin",
            AddressStrategy::MarketByContract => "market-by-contract",
            AddressStrategy::DexPair => "dex-pair",
        }
    }

    pub fn default_order() -> Vec<Self> {
        vec![
            AddressStrategy::CreatorRegistry,
            AddressStrategy::CreatorCoin,
            AddressStrategy::MarketByContract,
            AddressStrategy::DexPair,
        ]
    }
}

/// Strategies for symbols, ids and free text, in default order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextStrategy {
    /// Market data by id. Only tried for slug-shaped identifiers.
    MarketById,
    /// Registry profile by handle, then its creator coin's address.
    CreatorProfile,
    /// Prefix search of the discovery pool, then the first hit's address.
    DiscoveryPool,
}

impl TextStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            TextStrategy::MarketById => "market-by-id",
            TextStrategy::CreatorProfile => "creator-profile",
            TextStrategy::DiscoveryPool => "discovery-pool",
        }
    }

    pub fn default_order() -> Vec<Self> {
        vec![
            TextStrategy::MarketById,
            TextStrategy::CreatorProfile,
            TextStrategy::DiscoveryPool,
        ]
    }
}

/// Await `attempts` in order and return the first value `accept` approves.
///
/// Errors and empty results are logged and skipped; later attempts are never
/// started once one succeeds.
pub async fn first_success<'a, T, I, F>(label: &str, attempts: I, accept: F) -> Option<T>
where
    I: IntoIterator<Item = (&'static str, Attempt<'a, T>)>,
    F: Fn(&T) -> bool,
{
    for (name, attempt) in attempts {
        match attempt.await {
            Ok(Some(value)) if accept(&value) => {
                debug!("{}: resolved via {}", label, name);
                return Some(value);
            }
            Ok(Some(_)) => debug!("{}: {} returned an unusable record", label, name),
            Ok(None) => debug!("{}: {} had no result", label, name),
            Err(e) => warn!("{}: {} failed: {}", label, name, e),
        }
    }
    None
}
