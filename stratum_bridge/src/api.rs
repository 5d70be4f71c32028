use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, error, info, trace};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    config::{client_tag, BridgeConfig},
    error::BridgeError,
    listener::BlockTemplateListener,
    node::{wait_for_sync, BlockTemplate, MinerIdentity, NodeConnector, NodeSession},
    stats::{PrometheusStatsSink, StatsSampler, StatsSink},
};

// NodeApi must be behind a Arc to be shared between the stratum side and its tasks
pub type SharedNodeApi<C> = Arc<NodeApi<C>>;

// Entry point of the bridge toward the node.
// Callers hold this API and never the underlying client handle, so a
// reconnect is invisible to them except as transient errors.
pub struct NodeApi<C: NodeConnector> {
    config: BridgeConfig,
    session: Arc<NodeSession<C>>,
    sink: Arc<dyn StatsSink>,
    started: AtomicBool,
}

impl<C: NodeConnector + 'static> NodeApi<C> {
    // Connect to the node and export stats as prometheus gauges
    pub async fn new(config: BridgeConfig, connector: C) -> Result<SharedNodeApi<C>, BridgeError> {
        Self::with_sink(config, connector, Arc::new(PrometheusStatsSink::new())).await
    }

    pub async fn with_sink(
        config: BridgeConfig,
        connector: C,
        sink: Arc<dyn StatsSink>,
    ) -> Result<SharedNodeApi<C>, BridgeError> {
        config.validate()?;

        let session = NodeSession::connect(
            config.node_address.clone(),
            connector,
            config.rpc_timeout_duration(),
        )
        .await?;

        Ok(Arc::new(Self {
            config,
            session: Arc::new(session),
            sink,
            started: AtomicBool::new(false),
        }))
    }

    pub fn get_config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn get_session(&self) -> &Arc<NodeSession<C>> {
        &self.session
    }

    // Wait once for the node to be synced, then launch the block template
    // listener and the stats sampler until the shutdown token is cancelled.
    // A failing startup check is only logged: the listener takes over the
    // reconnect policy.
    pub async fn start<F>(
        self: &Arc<Self>,
        shutdown: CancellationToken,
        on_block_ready: F,
    ) -> Result<BridgeTasks, BridgeError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        trace!("Starting node api");
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BridgeError::AlreadyStarted);
        }

        match wait_for_sync(&self.session, true, &shutdown).await {
            Ok(()) => {}
            Err(BridgeError::Cancelled) => {
                debug!("shutdown requested during startup sync check");
                // nothing was spawned, a later start may try again
                self.started.store(false, Ordering::SeqCst);
                return Err(BridgeError::Cancelled);
            }
            Err(e) => {
                if log::log_enabled!(log::Level::Error) {
                    error!(
                        "[node {}] startup sync check failed: {:#}",
                        self.session.address(),
                        e
                    );
                }
            }
        }

        let tracker = TaskTracker::new();
        tracker.spawn(
            BlockTemplateListener::new(
                Arc::clone(&self.session),
                self.config.block_wait_duration(),
                Arc::new(on_block_ready),
                shutdown.clone(),
            )
            .run(),
        );

        if self.config.stats {
            tracker.spawn(
                StatsSampler::new(
                    Arc::clone(&self.session),
                    Arc::clone(&self.sink),
                    shutdown.clone(),
                )
                .run(),
            );
        }
        tracker.close();

        if log::log_enabled!(log::Level::Info) {
            info!("[node {}] node api started", self.session.address());
        }

        Ok(BridgeTasks { shutdown, tracker })
    }

    // Fetch a fresh block template for a miner, no retry
    pub async fn get_block_template(
        &self,
        miner: &MinerIdentity,
    ) -> Result<BlockTemplate, BridgeError> {
        trace!("get_block_template");
        self.session
            .get_block_template(&miner.wallet_address, &client_tag(&miner.remote_app))
            .await
            .map_err(BridgeError::BlockTemplate)
    }
}

// Long lived tasks launched by NodeApi::start
pub struct BridgeTasks {
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl BridgeTasks {
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn is_finished(&self) -> bool {
        self.tracker.is_empty()
    }

    // Resolves once every task has terminated
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }

    // Cancel the scope and wait for the tasks to terminate
    pub async fn stop(self) {
        trace!("Stopping node api tasks");
        self.shutdown.cancel();
        self.tracker.wait().await;
    }
}
