use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

// Version of the bridge, reported to the node in every block template request
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
// Name used to build the client identity string
pub const BRIDGE_NAME: &str = "tos-network/tos-stratum-bridge";

// node address by default when no specified
pub const DEFAULT_NODE_ADDRESS: &str = "127.0.0.1:8080";
// Maximum staleness in milliseconds before checking for a new template anyway
pub const DEFAULT_BLOCK_WAIT_TIME: u64 = 3000;
// Per RPC call bound in seconds
pub const DEFAULT_RPC_TIMEOUT: u64 = 30;

// Delay between two sync checks while the node is not synced
pub const SYNC_RETRY_INTERVAL: Duration = Duration::from_secs(5);
// Delay before the next loop iteration when a reconnect failed
pub const RECONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(5);
// Network stats sampling interval
pub const STATS_INTERVAL: Duration = Duration::from_secs(30);
// Number of blocks used by the node to estimate the network hashrate
pub const HASHRATE_WINDOW_SIZE: u32 = 1000;

// Functions Helpers
fn default_node_address() -> String {
    DEFAULT_NODE_ADDRESS.to_owned()
}

fn default_block_wait_time() -> u64 {
    DEFAULT_BLOCK_WAIT_TIME
}

fn default_rpc_timeout() -> u64 {
    DEFAULT_RPC_TIMEOUT
}

fn default_stats() -> bool {
    true
}

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Node RPC address to connect to
    #[clap(long, default_value_t = String::from(DEFAULT_NODE_ADDRESS))]
    #[serde(default = "default_node_address")]
    pub node_address: String,
    /// Maximum time in milliseconds to wait for a new block template
    /// notification before checking anyway
    #[clap(long, default_value_t = DEFAULT_BLOCK_WAIT_TIME)]
    #[serde(default = "default_block_wait_time")]
    pub block_wait_time: u64,
    /// Timeout in seconds for each RPC call to the node, 0 to disable it
    #[clap(long, default_value_t = DEFAULT_RPC_TIMEOUT)]
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout: u64,
    /// Sample network statistics from the node
    #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
    #[serde(default = "default_stats")]
    pub stats: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            node_address: default_node_address(),
            block_wait_time: default_block_wait_time(),
            rpc_timeout: default_rpc_timeout(),
            stats: default_stats(),
        }
    }
}

impl BridgeConfig {
    pub fn new<S: Into<String>>(node_address: S) -> Self {
        Self {
            node_address: node_address.into(),
            ..Default::default()
        }
    }

    pub fn with_block_wait_time(mut self, block_wait_time: Duration) -> Self {
        self.block_wait_time = block_wait_time.as_millis() as u64;
        self
    }

    // Rounded up to the second, a non zero duration always keeps a bound
    pub fn with_rpc_timeout(mut self, rpc_timeout: Option<Duration>) -> Self {
        self.rpc_timeout = match rpc_timeout {
            Some(d) if d > Duration::ZERO => {
                d.as_secs() + u64::from(d.subsec_nanos() > 0)
            }
            _ => 0,
        };
        self
    }

    pub fn with_stats(mut self, stats: bool) -> Self {
        self.stats = stats;
        self
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.node_address.trim().is_empty() {
            return Err(BridgeError::InvalidConfig("node address is empty"));
        }

        if self.block_wait_time == 0 {
            return Err(BridgeError::InvalidConfig(
                "block wait time must be greater than zero",
            ));
        }

        Ok(())
    }

    pub fn block_wait_duration(&self) -> Duration {
        Duration::from_millis(self.block_wait_time)
    }

    // None means no bound on RPC calls
    pub fn rpc_timeout_duration(&self) -> Option<Duration> {
        (self.rpc_timeout > 0).then(|| Duration::from_secs(self.rpc_timeout))
    }
}

// Build the identity string sent to the node with each block template request
pub fn client_tag(remote_app: &str) -> String {
    format!("'{}' via {}_{}", remote_app, BRIDGE_NAME, VERSION)
}
