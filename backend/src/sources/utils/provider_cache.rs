use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::transports::http::{Client, Http};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::sources::SourceError;
use crate::types::Chain;

const PROVIDER_TTL: Duration = Duration::from_secs(300);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub type HttpProvider = RootProvider<Http<Client>>;

/// RPC provider cache with per-endpoint health tracking and fallback.
#[derive(Clone)]
pub struct ProviderCache {
    providers: Arc<RwLock<HashMap<Chain, CachedProvider>>>,
    rpc_endpoints: HashMap<Chain, Vec<String>>,
    health_tracker: Arc<RwLock<HashMap<String, EndpointHealth>>>,
}

#[derive(Clone)]
struct CachedProvider {
    provider: HttpProvider,
    rpc_url: String,
    created_at: Instant,
}

#[derive(Debug, Clone)]
struct EndpointHealth {
    success_rate: f32,
    last_failure: Option<Instant>,
    consecutive_failures: u32,
}

impl Default for EndpointHealth {
    fn default() -> Self {
        Self {
            success_rate: 1.0,
            last_failure: None,
            consecutive_failures: 0,
        }
    }
}

impl ProviderCache {
    pub fn new(rpc_endpoints: HashMap<Chain, Vec<String>>) -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
            rpc_endpoints,
            health_tracker: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Provider for `chain`, trying endpoints from healthiest to least healthy.
    pub async fn get_provider(&self, chain: Chain) -> Result<HttpProvider, SourceError> {
        if let Some(provider) = self.get_cached_provider(chain) {
            return Ok(provider);
        }

        let endpoints = self
            .rpc_endpoints
            .get(&chain)
            .filter(|urls| !urls.is_empty())
            .ok_or_else(|| SourceError::Unavailable(format!("No RPCs configured for chain: {}", chain)))?;

        let ordered = self.order_endpoints_by_health(chain, endpoints);
        for (i, rpc_url) in ordered.iter().enumerate() {
            match self.create_provider(rpc_url).await {
                Ok(provider) => {
                    self.cache_provider(chain, rpc_url, provider.clone());
                    self.record_success(chain, rpc_url);
                    debug!("RPC provider for {} ready via {}", chain, rpc_url);
                    return Ok(provider);
                }
                Err(e) => {
                    warn!("RPC endpoint {} for {} failed: {}", rpc_url, chain, e);
                    self.record_failure(chain, rpc_url);
                    if i < ordered.len() - 1 {
                        sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }

        Err(SourceError::Unavailable(format!("All RPC endpoints failed for chain: {}", chain)))
    }

    async fn create_provider(&self, rpc_url: &str) -> Result<HttpProvider, SourceError> {
        let parsed_url = rpc_url
            .parse()
            .map_err(|e| SourceError::Unavailable(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

        let provider = ProviderBuilder::new().on_http(parsed_url);

        match tokio::time::timeout(PROBE_TIMEOUT, provider.get_block_number()).await {
            Ok(Ok(_)) => Ok(provider),
            Ok(Err(e)) => Err(SourceError::Unavailable(format!("Provider probe failed: {}", e))),
            Err(_) => Err(SourceError::Unavailable("Provider probe timed out".to_string())),
        }
    }

    fn get_cached_provider(&self, chain: Chain) -> Option<HttpProvider> {
        let providers = self.providers.read().ok()?;
        let cached = providers.get(&chain)?;
        if cached.created_at.elapsed() < PROVIDER_TTL {
            Some(cached.provider.clone())
        } else {
            None
        }
    }

    fn cache_provider(&self, chain: Chain, rpc_url: &str, provider: HttpProvider) {
        if let Ok(mut providers) = self.providers.write() {
            providers.insert(
                chain,
                CachedProvider {
                    provider,
                    rpc_url: rpc_url.to_string(),
                    created_at: Instant::now(),
                },
            );
        }
    }

    /// Run `call` against the chain's provider. A failed call counts against
    /// the endpoint that served it, drops the cached provider and is retried
    /// once on whichever endpoint is healthiest next.
    pub async fn with_provider<T, F, Fut>(&self, chain: Chain, call: F) -> Result<T, SourceError>
    where
        F: Fn(HttpProvider) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, SourceError>> + Send,
        T: Send,
    {
        let provider = self.get_provider(chain).await?;
        match call(provider).await {
            Err(SourceError::Contract(reason)) => {
                warn!("RPC call on {} failed, retrying on next endpoint: {}", chain, reason);
                self.evict(chain);
                let provider = self.get_provider(chain).await?;
                call(provider).await
            }
            result => result,
        }
    }

    fn order_endpoints_by_health(&self, chain: Chain, endpoints: &[String]) -> Vec<String> {
        let health = self.health_tracker.read().ok();
        let mut scored: Vec<(String, f32)> = endpoints
            .iter()
            .map(|url| {
                let score = health
                    .as_ref()
                    .and_then(|h| h.get(&health_key(chain, url)))
                    .map(health_score)
                    .unwrap_or(1.0);
                (url.clone(), score)
            })
            .collect();

        // Stable sort keeps configured order among equally healthy endpoints
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(url, _)| url).collect()
    }

    fn record_success(&self, chain: Chain, rpc_url: &str) {
        if let Ok(mut health) = self.health_tracker.write() {
            let entry = health.entry(health_key(chain, rpc_url)).or_default();
            entry.success_rate = entry.success_rate * 0.9 + 0.1;
            entry.consecutive_failures = 0;
        }
    }

    fn record_failure(&self, chain: Chain, rpc_url: &str) {
        if let Ok(mut health) = self.health_tracker.write() {
            let entry = health.entry(health_key(chain, rpc_url)).or_default();
            entry.success_rate *= 0.9;
            entry.last_failure = Some(Instant::now());
            entry.consecutive_failures += 1;
        }
    }

    /// Drop the cached provider and mark its endpoint unhealthy so the next
    /// call re-probes endpoints, healthiest first.
    pub fn evict(&self, chain: Chain) {
        let evicted = match self.providers.write() {
            Ok(mut providers) => providers.remove(&chain),
            Err(_) => None,
        };
        if let Some(cached) = evicted {
            self.record_failure(chain, &cached.rpc_url);
        }
    }

    pub fn endpoints(&self, chain: Chain) -> &[String] {
        self.rpc_endpoints.get(&chain).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn health_key(chain: Chain, url: &str) -> String {
    format!("{}:{}", chain, url)
}

/// 0.0 (worst) to 1.0 (best).
fn health_score(health: &EndpointHealth) -> f32 {
    let mut score = health.success_rate;

    if let Some(last_failure) = health.last_failure {
        if last_failure.elapsed() < Duration::from_secs(60) {
            score *= 0.5;
        }
    }
    if health.consecutive_failures > 0 {
        score *= 0.9_f32.powi(health.consecutive_failures as i32);
    }

    score.clamp(0.0, 1.0)
}
