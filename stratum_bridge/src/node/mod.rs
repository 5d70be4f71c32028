pub mod rpc;
pub mod session;
pub mod sync;
pub mod types;

pub use rpc::{NodeConnector, NodeRpc, NotificationHandler};
pub use session::NodeSession;
pub use sync::{is_synced, wait_for_sync};
pub use types::{BlockDagInfo, BlockTemplate, GetInfoResult, Hash, HashrateEstimate, MinerIdentity};
