// Network statistics sampling
// Stats are best effort: a failing query only skips the current tick and
// never triggers a reconnect.

use std::{sync::Arc, time::Duration};

use log::{debug, warn};
use metrics::{describe_gauge, gauge};
use tokio::{
    select,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{HASHRATE_WINDOW_SIZE, STATS_INTERVAL},
    node::{NodeConnector, NodeSession},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkStats {
    pub network_hashes_per_second: f64,
    pub block_count: u64,
    pub difficulty: f64,
}

// Write only destination for network stats
pub trait StatsSink: Send + Sync {
    fn record_network_stats(&self, stats: &NetworkStats);
}

// Exports network stats as gauges through the metrics facade
pub struct PrometheusStatsSink;

impl PrometheusStatsSink {
    pub fn new() -> Self {
        describe_gauge!(
            "tos_bridge_network_hashrate",
            "Estimated network hashrate in hashes per second"
        );
        describe_gauge!(
            "tos_bridge_network_block_count",
            "Number of blocks in the node DAG"
        );
        describe_gauge!(
            "tos_bridge_network_difficulty",
            "Current network difficulty"
        );
        Self
    }
}

impl Default for PrometheusStatsSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsSink for PrometheusStatsSink {
    fn record_network_stats(&self, stats: &NetworkStats) {
        gauge!("tos_bridge_network_hashrate").set(stats.network_hashes_per_second);
        gauge!("tos_bridge_network_block_count").set(stats.block_count as f64);
        gauge!("tos_bridge_network_difficulty").set(stats.difficulty);
    }
}

pub struct StatsSampler<C: NodeConnector> {
    session: Arc<NodeSession<C>>,
    sink: Arc<dyn StatsSink>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl<C: NodeConnector> StatsSampler<C> {
    pub fn new(
        session: Arc<NodeSession<C>>,
        sink: Arc<dyn StatsSink>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            session,
            sink,
            interval: STATS_INTERVAL,
            shutdown,
        }
    }

    // Runs until the shutdown token is cancelled
    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some(stats) = self.sample().await {
                        self.sink.record_network_stats(&stats);
                    }
                }
            }
        }

        if log::log_enabled!(log::Level::Warn) {
            warn!(
                "[node {}] shutdown requested, stopping stats sampler",
                self.session.address()
            );
        }
    }

    // Query the DAG info then the hashrate estimation anchored on its first tip
    pub async fn sample(&self) -> Option<NetworkStats> {
        let dag_info = match self.session.get_block_dag_info().await {
            Ok(dag_info) => dag_info,
            Err(e) => {
                if log::log_enabled!(log::Level::Warn) {
                    warn!(
                        "[node {}] failed to get block DAG info from node, stats may be stale: {:#}",
                        self.session.address(),
                        e
                    );
                }
                return None;
            }
        };

        let Some(tip_hash) = dag_info.tip_hashes.first() else {
            if log::log_enabled!(log::Level::Warn) {
                warn!(
                    "[node {}] node reported no tip hashes, stats may be stale",
                    self.session.address()
                );
            }
            return None;
        };

        let estimate = match self
            .session
            .estimate_network_hashes_per_second(tip_hash, HASHRATE_WINDOW_SIZE)
            .await
        {
            Ok(estimate) => estimate,
            Err(e) => {
                if log::log_enabled!(log::Level::Warn) {
                    warn!(
                        "[node {}] failed to get network hashrate from node, stats may be stale: {:#}",
                        self.session.address(),
                        e
                    );
                }
                return None;
            }
        };

        let stats = NetworkStats {
            network_hashes_per_second: estimate.network_hashes_per_second,
            block_count: dag_info.block_count,
            difficulty: dag_info.difficulty,
        };

        if log::log_enabled!(log::Level::Debug) {
            debug!("network stats: {:?}", stats);
        }

        Some(stats)
    }
}
