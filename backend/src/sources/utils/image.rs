use crate::types::Chain;

const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Image URLs a source may report for one token. Collapsed to a single URL
/// with [`ImageCandidates::resolve`].
#[derive(Debug, Clone, Default)]
pub struct ImageCandidates {
    pub preview: Option<String>,
    pub full: Option<String>,
    pub thumb: Option<String>,
    pub small: Option<String>,
}

impl ImageCandidates {
    pub fn full(url: Option<String>) -> Self {
        Self {
            full: url,
            ..Self::default()
        }
    }

    /// First usable URL in order preview, full-size, thumbnail, small.
    pub fn resolve(self) -> Option<String> {
        [self.preview, self.full, self.thumb, self.small]
            .into_iter()
            .flatten()
            .find_map(|url| absolute_url(&url))
    }
}

/// Turn a source URL into an absolute http(s) URL; `ipfs://` is rewritten to
/// a public gateway, anything else is rejected.
pub fn absolute_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.starts_with("https://") || raw.starts_with("http://") {
        Some(raw.to_string())
    } else {
        raw.strip_prefix("ipfs://")
            .filter(|cid| !cid.is_empty())
            .map(|cid| format!("{}{}", IPFS_GATEWAY, cid.trim_start_matches("ipfs/")))
    }
}

/// Logos for well-known symbols when no source supplied one.
pub fn default_logo(symbol: &str) -> Option<&'static str> {
    match symbol.trim().to_lowercase().as_str() {
        "eth" | "ethereum" | "weth" => Some("https://assets.coingecko.com/coins/images/279/large/ethereum.png"),
        "btc" | "bitcoin" => Some("https://assets.coingecko.com/coins/images/1/large/bitcoin.png"),
        "usdc" => Some("https://assets.coingecko.com/coins/images/6319/large/usdc.png"),
        _ => None,
    }
}

/// DexScreener CDN path for a chain token's logo.
pub fn dexscreener_cdn_image(chain: Chain, address: &str) -> String {
    format!(
        "https://dd.dexscreener.com/ds-data/tokens/{}/{}.png",
        chain.as_str(),
        address.trim().to_lowercase()
    )
}
