use alloy::primitives::{address, keccak256, Address, B256};
use alloy::sol;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::sources::utils::{HttpProvider, ProviderCache};
use crate::sources::{NameRegistry, SourceError};
use crate::types::Chain;

/// ENS registry on Ethereum mainnet.
pub const ENS_REGISTRY: Address = address!("00000000000C2E074eC69A0dFb2997BA6C7d2e1e");
/// Basenames registry on Base.
pub const BASENAME_REGISTRY: Address = address!("b94704422c2a1e396835a571837aa5ae53285a95");

pub const BASENAME_SUFFIX: &str = ".base.eth";
pub const ENS_SUFFIX: &str = ".eth";

sol! {
    #[sol(rpc)]
    interface INameRegistry {
        function resolver(bytes32 node) external view returns (address resolverAddress);
    }

    #[sol(rpc)]
    interface IAddrResolver {
        function addr(bytes32 node) external view returns (address resolvedAddress);
    }

    #[sol(rpc)]
    interface INameResolver {
        function name(bytes32 node) external view returns (string resolvedName);
    }

    #[sol(rpc)]
    interface ITextResolver {
        function text(bytes32 node, string key) external view returns (string value);
    }
}

const REVERSE_SUFFIX: &str = "addr.reverse";
const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// EIP-137 namehash.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(buf);
    }
    node
}

/// Lowercased, trimmed form used for lookups. Full UTS-46 mapping is not applied.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Name registry that follows the `resolver(node)` then `addr(node)` flow.
#[derive(Clone)]
pub struct RegistryNameResolver {
    label: &'static str,
    chain: Chain,
    registry: Address,
    provider_cache: ProviderCache,
}

impl RegistryNameResolver {
    /// `*.base.eth` names on Base.
    pub fn basenames(provider_cache: ProviderCache) -> Self {
        Self {
            label: "Basenames",
            chain: Chain::Base,
            registry: BASENAME_REGISTRY,
            provider_cache,
        }
    }

    /// Every other `*.eth` name on mainnet.
    pub fn ens(provider_cache: ProviderCache) -> Self {
        Self {
            label: "ENS",
            chain: Chain::Ethereum,
            registry: ENS_REGISTRY,
            provider_cache,
        }
    }

    fn is_basename(&self) -> bool {
        self.registry == BASENAME_REGISTRY
    }

    async fn resolver_for(&self, provider: &HttpProvider, node: B256, name: &str) -> Result<Address, SourceError> {
        let resolver = INameRegistry::new(self.registry, provider)
            .resolver(node)
            .call()
            .await
            .map_err(|e| {
                warn!("{} resolver lookup for {} failed: {}", self.label, name, e);
                SourceError::Contract(format!("resolver() failed: {}", e))
            })?
            .resolverAddress;
        if resolver == Address::ZERO {
            debug!("{} has no resolver for {}", self.label, name);
        }
        Ok(resolver)
    }

    async fn forward(&self, provider: HttpProvider, name: String) -> Result<Option<String>, SourceError> {
        let node = namehash(&name);
        let resolver = self.resolver_for(&provider, node, &name).await?;
        if resolver == Address::ZERO {
            return Ok(None);
        }

        let resolved = IAddrResolver::new(resolver, &provider)
            .addr(node)
            .call()
            .await
            .map_err(|e| SourceError::Contract(format!("addr() failed: {}", e)))?
            .resolvedAddress;

        if resolved == Address::ZERO {
            return Ok(None);
        }
        Ok(Some(format!("{:?}", resolved).to_lowercase()))
    }

    async fn reverse(&self, provider: HttpProvider, address: String) -> Result<Option<String>, SourceError> {
        let reverse_name = reverse_node_name(&address);
        let node = namehash(&reverse_name);
        let resolver = self.resolver_for(&provider, node, &reverse_name).await?;
        if resolver == Address::ZERO {
            return Ok(None);
        }

        let name = INameResolver::new(resolver, &provider)
            .name(node)
            .call()
            .await
            .map_err(|e| SourceError::Contract(format!("name() failed: {}", e)))?
            .resolvedName;
        let name = normalize_name(&name);
        if name.is_empty() {
            return Ok(None);
        }

        // A reverse record is only trusted when the name points back
        match self.forward(provider, name.clone()).await? {
            Some(forward) if forward == address => Ok(Some(name)),
            _ => {
                debug!("{} reverse record {} does not resolve back to {}", self.label, name, address);
                Ok(None)
            }
        }
    }

    async fn text_avatar(&self, provider: HttpProvider, name: String) -> Result<Option<String>, SourceError> {
        let node = namehash(&name);
        let resolver = self.resolver_for(&provider, node, &name).await?;
        if resolver == Address::ZERO {
            return Ok(None);
        }

        let avatar = ITextResolver::new(resolver, &provider)
            .text(node, "avatar".to_string())
            .call()
            .await
            .map_err(|e| SourceError::Contract(format!("text() failed: {}", e)))?
            .value;
        Ok(avatar_url(&avatar))
    }
}

/// `<hex address without 0x>.addr.reverse`
fn reverse_node_name(address: &str) -> String {
    let hex = address.trim().to_lowercase();
    let hex = hex.strip_prefix("0x").unwrap_or(&hex);
    format!("{}.{}", hex, REVERSE_SUFFIX)
}

/// Avatar records that point at an image over http(s) or IPFS. NFT avatar
/// URIs are not followed.
pub fn avatar_url(record: &str) -> Option<String> {
    let record = record.trim();
    if record.starts_with("https://") || record.starts_with("http://") {
        Some(record.to_string())
    } else {
        record
            .strip_prefix("ipfs://")
            .map(|cid| cid.trim_start_matches("ipfs/"))
            .filter(|cid| !cid.is_empty())
            .map(|cid| format!("{}{}", IPFS_GATEWAY, cid))
    }
}

#[async_trait]
impl NameRegistry for RegistryNameResolver {
    fn handles(&self, name: &str) -> bool {
        let name = normalize_name(name);
        if self.is_basename() {
            name.ends_with(BASENAME_SUFFIX)
        } else {
            name.ends_with(ENS_SUFFIX) && !name.ends_with(BASENAME_SUFFIX)
        }
    }

    async fn resolve_name(&self, name: &str) -> Result<Option<String>, SourceError> {
        let name = normalize_name(name);
        self.provider_cache
            .with_provider(self.chain, |provider| self.forward(provider, name.clone()))
            .await
    }

    async fn reverse_name(&self, address: &str) -> Result<Option<String>, SourceError> {
        if self.is_basename() {
            return Ok(None);
        }
        let address = address.trim().to_lowercase();
        self.provider_cache
            .with_provider(self.chain, |provider| self.reverse(provider, address.clone()))
            .await
    }

    async fn avatar(&self, name: &str) -> Result<Option<String>, SourceError> {
        let name = normalize_name(name);
        self.provider_cache
            .with_provider(self.chain, |provider| self.text_avatar(provider, name.clone()))
            .await
    }

    fn registry_name(&self) -> &'static str {
        self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn namehash_matches_known_vectors() {
        assert_eq!(namehash(""), B256::ZERO);
        assert_eq!(
            namehash("eth"),
            "0x93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae"
                .parse::<B256>()
                .unwrap()
        );
        assert_eq!(
            namehash("foo.eth"),
            "0xde9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f"
                .parse::<B256>()
                .unwrap()
        );
    }

    #[test]
    fn routes_names_to_the_right_registry() {
        let cache = ProviderCache::new(HashMap::new());
        let basenames = RegistryNameResolver::basenames(cache.clone());
        let ens = RegistryNameResolver::ens(cache);

        assert!(basenames.handles("scottexplores.base.eth"));
        assert!(!basenames.handles("vitalik.eth"));
        assert!(ens.handles("Vitalik.ETH"));
        assert!(!ens.handles("scottexplores.base.eth"));
        assert!(!ens.handles("ethereum"));
    }

    #[test]
    fn reverse_node_uses_bare_lowercase_hex() {
        assert_eq!(
            reverse_node_name("0xABCDEF0000000000000000000000000000000001"),
            "abcdef0000000000000000000000000000000001.addr.reverse"
        );
    }

    #[test]
    fn avatar_records_are_mapped_to_urls() {
        assert_eq!(
            avatar_url("https://example.com/a.png").as_deref(),
            Some("https://example.com/a.png")
        );
        assert_eq!(
            avatar_url("ipfs://QmAvatar").as_deref(),
            Some("https://ipfs.io/ipfs/QmAvatar")
        );
        assert_eq!(
            avatar_url("ipfs://ipfs/QmAvatar").as_deref(),
            Some("https://ipfs.io/ipfs/QmAvatar")
        );
        assert!(avatar_url("eip155:1/erc721:0xabc/1").is_none());
        assert!(avatar_url("").is_none());
    }

    #[tokio::test]
    async fn basenames_skip_reverse_lookups() {
        let basenames = RegistryNameResolver::basenames(ProviderCache::new(HashMap::new()));
        assert_eq!(basenames.reverse_name("0x0000000000000000000000000000000000000001").await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_rpc_is_an_error_not_a_panic() {
        let ens = RegistryNameResolver::ens(ProviderCache::new(HashMap::new()));
        assert!(ens.resolve_name("vitalik.eth").await.is_err());
    }
}
