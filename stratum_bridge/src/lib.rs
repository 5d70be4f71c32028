// TOS Stratum Bridge
// Keeps a single logical connection to a TOS node alive, signals when a new
// block template may be available and samples network statistics.

#![allow(clippy::type_complexity)]
#![warn(clippy::correctness)]

extern crate log;

pub mod api;
pub mod config;
pub mod error;
pub mod listener;
pub mod node;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{BridgeTasks, NodeApi, SharedNodeApi};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use listener::{BlockReadyCallback, BlockTemplateListener};
pub use node::{
    BlockDagInfo, BlockTemplate, GetInfoResult, Hash, HashrateEstimate, MinerIdentity,
    NodeConnector, NodeRpc, NodeSession, NotificationHandler,
};
pub use stats::{NetworkStats, PrometheusStatsSink, StatsSampler, StatsSink};
