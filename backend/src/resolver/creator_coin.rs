use std::sync::Arc;
use tracing::{debug, warn};

use crate::sources::dexscreener::most_liquid_pair;
use crate::sources::utils::{dexscreener_cdn_image, TokenUtils};
use crate::sources::{CreatorRegistry, NameRegistry, OnchainReader, PairSource, SourceError};
use crate::types::{Chain, CreatorInfo, TokenData, DEFAULT_DECIMALS};

/// Share of total supply treated as circulating for creator coins. Half of
/// every creator coin's supply is vested to the creator.
pub const CREATOR_CIRCULATING_SHARE: f64 = 0.5;

/// Builds a creator-coin record from on-chain metadata, DEX price and
/// registry metadata.
#[derive(Clone)]
pub struct CreatorCoinAggregator {
    chain: Chain,
    onchain: Arc<dyn OnchainReader>,
    pairs: Arc<dyn PairSource>,
    registry: Arc<dyn CreatorRegistry>,
    names: Vec<Arc<dyn NameRegistry>>,
}

impl CreatorCoinAggregator {
    pub fn new(
        chain: Chain,
        onchain: Arc<dyn OnchainReader>,
        pairs: Arc<dyn PairSource>,
        registry: Arc<dyn CreatorRegistry>,
        names: Vec<Arc<dyn NameRegistry>>,
    ) -> Self {
        Self {
            chain,
            onchain,
            pairs,
            registry,
            names,
        }
    }

    /// Primary name and avatar of the creator. Lookup failures leave the
    /// shortened address as the display name.
    async fn creator_info(&self, owner: &str) -> CreatorInfo {
        for names in &self.names {
            match names.reverse_name(owner).await {
                Ok(Some(ens)) => {
                    let avatar = names.avatar(&ens).await.unwrap_or_else(|e| {
                        warn!("{} avatar lookup for {} failed: {}", names.registry_name(), ens, e);
                        None
                    });
                    return CreatorInfo::from_ens(owner, Some(ens), avatar);
                }
                Ok(None) => {}
                Err(e) => warn!("{} reverse lookup for {} failed: {}", names.registry_name(), owner, e),
            }
        }
        CreatorInfo::from_ens(owner, None, None)
    }

    /// `Ok(None)` when the contract has no symbol or the registry has no
    /// metadata for it.
    pub async fn fetch(&self, address: &str) -> Result<Option<TokenData>, SourceError> {
        let address = TokenUtils::normalize_address(address);
        let metadata = self.onchain.token_metadata(self.chain, &address).await?;

        let symbol = match metadata.symbol.clone() {
            Some(symbol) => symbol,
            None => {
                debug!("{} has no ERC-20 symbol, not a creator coin", address);
                return Ok(None);
            }
        };

        let lookup = [address.clone()];
        let (pairs, registry_metadata) = tokio::join!(
            self.pairs.pairs_for_tokens(&lookup),
            self.registry.token_metadata(&address)
        );

        let registry_metadata = match registry_metadata? {
            Some(metadata) => metadata,
            None => {
                debug!("Registry has no metadata for {}", address);
                return Ok(None);
            }
        };
        let pairs = pairs.unwrap_or_else(|e| {
            warn!("Pair lookup for creator coin {} failed: {}", address, e);
            Vec::new()
        });
        let pair = most_liquid_pair(&pairs, &address);

        let price = pair.map(|p| p.price_usd()).unwrap_or(0.0);
        let decimals = metadata.decimals.unwrap_or(DEFAULT_DECIMALS);
        let total_supply = metadata
            .total_supply
            .map(|supply| TokenUtils::units_to_f64(supply, decimals))
            .unwrap_or(0.0);
        let circulating_supply = total_supply * CREATOR_CIRCULATING_SHARE;

        let name = metadata
            .name
            .clone()
            .or_else(|| registry_metadata.name.clone())
            .unwrap_or_else(|| symbol.clone());

        let mut token = TokenData::new(address.clone(), symbol, name);
        token.current_price = price;
        token.market_cap = circulating_supply * price;
        token.decimals = decimals;
        token.image = registry_metadata
            .image
            .clone()
            .or_else(|| pair.and_then(|p| p.image_url()))
            .or_else(|| Some(dexscreener_cdn_image(self.chain, &address)));
        token.creator_address = registry_metadata
            .owner
            .clone()
            .or_else(|| metadata.non_zero_owner());
        if let Some(owner) = token.creator_address.as_deref() {
            token.creator = Some(self.creator_info(owner).await);
        }
        token.address = Some(address);

        Ok(Some(token.normalized()))
    }
}
