pub mod holdings;

pub use holdings::WalletHoldingsAggregator;

use std::time::Duration;

use crate::types::Chain;

#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub chain: Chain,
    /// Addresses per DEX pricing request.
    pub price_chunk_size: usize,
    pub cache_ttl: Duration,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            chain: Chain::Base,
            price_chunk_size: 30,
            cache_ttl: Duration::from_secs(30),
        }
    }
}
