use alloy::primitives::{address, Address, Bytes, U256};
use alloy::providers::Provider;
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::sources::utils::{ProviderCache, TokenUtils};
use crate::sources::{OnchainReader, SourceError};
use crate::types::Chain;

/// Multicall3, deployed at the same address on every supported chain.
pub const MULTICALL3: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

sol! {
    #[derive(Debug)]
    #[sol(rpc)]
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct CallResult {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (CallResult[] memory returnData);
    }

    #[derive(Debug)]
    interface IErc20Metadata {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function owner() external view returns (address);
    }
}

/// ERC-20 metadata read in one batch; each field is `None` if its call failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnchainTokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<U256>,
    pub owner: Option<String>,
}

impl OnchainTokenMetadata {
    /// Owner address unless it is missing or the zero address.
    pub fn non_zero_owner(&self) -> Option<String> {
        self.owner
            .clone()
            .filter(|owner| !TokenUtils::is_zero_address(owner))
    }
}

/// On-chain reads over HTTP JSON-RPC using alloy.
#[derive(Clone)]
pub struct AlloyOnchainReader {
    provider_cache: ProviderCache,
}

impl AlloyOnchainReader {
    pub fn new(provider_cache: ProviderCache) -> Self {
        Self { provider_cache }
    }
}

fn metadata_calls(token: Address) -> Vec<IMulticall3::Call3> {
    let encoded: [Vec<u8>; 5] = [
        IErc20Metadata::nameCall {}.abi_encode(),
        IErc20Metadata::symbolCall {}.abi_encode(),
        IErc20Metadata::decimalsCall {}.abi_encode(),
        IErc20Metadata::totalSupplyCall {}.abi_encode(),
        IErc20Metadata::ownerCall {}.abi_encode(),
    ];
    encoded
        .into_iter()
        .map(|data| IMulticall3::Call3 {
            target: token,
            allowFailure: true,
            callData: Bytes::from(data),
        })
        .collect()
}

fn successful_data(results: &[IMulticall3::CallResult], index: usize) -> Option<&[u8]> {
    results
        .get(index)
        .filter(|r| r.success)
        .map(|r| r.returnData.as_ref())
}

/// Decode the five metadata results in call order, skipping failed calls.
fn decode_metadata(results: &[IMulticall3::CallResult]) -> OnchainTokenMetadata {
    let ok = |index: usize| successful_data(results, index);

    OnchainTokenMetadata {
        name: ok(0)
            .and_then(|d| IErc20Metadata::nameCall::abi_decode_returns(d, true).ok())
            .map(|r| r._0)
            .filter(|s| !s.trim().is_empty()),
        symbol: ok(1)
            .and_then(|d| IErc20Metadata::symbolCall::abi_decode_returns(d, true).ok())
            .map(|r| r._0)
            .filter(|s| !s.trim().is_empty()),
        decimals: ok(2)
            .and_then(|d| IErc20Metadata::decimalsCall::abi_decode_returns(d, true).ok())
            .map(|r| r._0),
        total_supply: ok(3)
            .and_then(|d| IErc20Metadata::totalSupplyCall::abi_decode_returns(d, true).ok())
            .map(|r| r._0),
        owner: ok(4)
            .and_then(|d| IErc20Metadata::ownerCall::abi_decode_returns(d, true).ok())
            .map(|r| format!("{:?}", r._0).to_lowercase()),
    }
}

#[async_trait]
impl OnchainReader for AlloyOnchainReader {
    async fn token_metadata(&self, chain: Chain, address: &str) -> Result<OnchainTokenMetadata, SourceError> {
        let token = TokenUtils::parse_address(address)
            .ok_or_else(|| SourceError::InvalidIdentifier(address.to_string()))?;
        let response = self
            .provider_cache
            .with_provider(chain, |provider| async move {
                IMulticall3::new(MULTICALL3, &provider)
                    .aggregate3(metadata_calls(token))
                    .call()
                    .await
                    .map_err(|e| {
                        warn!("Multicall for {} on {} failed: {}", address, chain, e);
                        SourceError::Contract(format!("aggregate3 failed: {}", e))
                    })
            })
            .await?;

        let metadata = decode_metadata(&response.returnData);
        debug!(
            "On-chain metadata for {}: symbol={:?} decimals={:?}",
            address, metadata.symbol, metadata.decimals
        );
        Ok(metadata)
    }

    async fn native_balance(&self, chain: Chain, owner: &str) -> Result<U256, SourceError> {
        let owner = TokenUtils::parse_address(owner)
            .ok_or_else(|| SourceError::InvalidIdentifier(owner.to_string()))?;
        self.provider_cache
            .with_provider(chain, |provider| async move {
                provider
                    .get_balance(owner)
                    .await
                    .map_err(|e| SourceError::Contract(format!("eth_getBalance failed: {}", e)))
            })
            .await
    }
}
