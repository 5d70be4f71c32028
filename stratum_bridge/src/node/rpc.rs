use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::types::{BlockDagInfo, BlockTemplate, GetInfoResult, Hash, HashrateEstimate};

// Called by the RPC client each time the node announces a new block template
pub type NotificationHandler = Arc<dyn Fn() + Send + Sync>;

// Capabilities the bridge needs from a node RPC client.
// Implementations own the wire protocol, every error is a transport error.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn get_info(&self) -> Result<GetInfoResult>;

    async fn get_block_dag_info(&self) -> Result<BlockDagInfo>;

    async fn estimate_network_hashes_per_second(
        &self,
        start_hash: &Hash,
        window_size: u32,
    ) -> Result<HashrateEstimate>;

    async fn get_block_template(&self, pay_address: &str, extra_data: &str)
        -> Result<BlockTemplate>;

    async fn register_for_new_block_template_notifications(
        &self,
        handler: NotificationHandler,
    ) -> Result<()>;

    // Re-establish the connection in place, the address can't change
    async fn reconnect(&self) -> Result<()>;
}

// Builds a fresh RPC client against a node address
#[async_trait]
pub trait NodeConnector: Send + Sync {
    type Client: NodeRpc + 'static;

    async fn connect(&self, address: &str) -> Result<Self::Client>;
}
