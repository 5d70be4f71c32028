use std::time::Duration;

use anyhow::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("error fetching server info from node @ {address}")]
    SyncCheck {
        address: String,
        #[source]
        source: Error,
    },
    #[error("error connecting to node @ {address}")]
    Connect {
        address: String,
        #[source]
        source: Error,
    },
    #[error("error reconnecting to node @ {address}")]
    Reconnect {
        address: String,
        #[source]
        source: Error,
    },
    #[error("failed fetching new block template from node")]
    BlockTemplate(#[source] Error),
    #[error("failed to register for block template notifications")]
    Subscription(#[source] Error),
    #[error("RPC call '{method}' timed out after {timeout:?}")]
    Timeout {
        method: &'static str,
        timeout: Duration,
    },
    #[error("no connection to the node")]
    NotConnected,
    #[error("operation cancelled")]
    Cancelled,
    #[error("node api is already started")]
    AlreadyStarted,
    #[error("invalid configuration: {}", _0)]
    InvalidConfig(&'static str),
}

impl BridgeError {
    // Cancellation is a normal terminal transition, not a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
