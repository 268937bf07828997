use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use super::DiscoveryAggregator;

/// Periodically refreshes the discovery pool in the background.
pub struct DiscoveryScheduler {
    aggregator: Arc<DiscoveryAggregator>,
    interval: Duration,
    is_running: Arc<RwLock<bool>>,
    last_run: Arc<RwLock<Option<Instant>>>,
}

impl DiscoveryScheduler {
    pub fn new(aggregator: Arc<DiscoveryAggregator>, interval: Duration) -> Self {
        Self {
            aggregator,
            interval,
            is_running: Arc::new(RwLock::new(false)),
            last_run: Arc::new(RwLock::new(None)),
        }
    }

    /// Start the refresh loop. The first refresh runs immediately.
    pub async fn start(&self) {
        let mut is_running = self.is_running.write().await;
        if *is_running {
            warn!("Discovery scheduler is already running");
            return;
        }
        *is_running = true;
        drop(is_running);

        info!("Starting discovery scheduler with {}s interval", self.interval.as_secs());

        let aggregator = Arc::clone(&self.aggregator);
        let is_running = Arc::clone(&self.is_running);
        let last_run = Arc::clone(&self.last_run);
        let interval = self.interval;

        tokio::spawn(async move {
            loop {
                if !*is_running.read().await {
                    info!("Discovery scheduler stopped");
                    break;
                }

                let pool = aggregator.force_refresh().await;
                *last_run.write().await = Some(Instant::now());
                info!("Scheduled discovery refresh: {} candidates", pool.len());

                sleep(interval).await;
            }
        });
    }

    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        info!("Discovery scheduler stop requested");
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub async fn last_run_time(&self) -> Option<Instant> {
        *self.last_run.read().await
    }

    /// Refresh now, outside the schedule. Returns the new pool size.
    pub async fn trigger_immediate_run(&self) -> usize {
        info!("Triggering immediate discovery refresh");
        let pool = self.aggregator.force_refresh().await;
        *self.last_run.write().await = Some(Instant::now());
        pool.len()
    }

    pub async fn next_run_time(&self) -> Option<Instant> {
        self.last_run_time().await.map(|last| last + self.interval)
    }
}
