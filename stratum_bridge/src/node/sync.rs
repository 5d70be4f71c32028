use log::{info, trace, warn};
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;

use super::{rpc::NodeConnector, session::NodeSession};
use crate::{config::SYNC_RETRY_INTERVAL, error::BridgeError};

// Single sync state check, never cached
pub async fn is_synced<C: NodeConnector>(session: &NodeSession<C>) -> Result<bool, BridgeError> {
    trace!("is_synced");
    let info = session
        .get_info()
        .await
        .map_err(|source| BridgeError::SyncCheck {
            address: session.address().to_owned(),
            source,
        })?;

    Ok(info.is_synced)
}

// Block until the node reports itself as synced.
// A failing query is returned right away, retry policy belongs to the caller.
// While the node is not synced, wait a fixed interval and check again.
pub async fn wait_for_sync<C: NodeConnector>(
    session: &NodeSession<C>,
    verbose: bool,
    shutdown: &CancellationToken,
) -> Result<(), BridgeError> {
    if verbose && log::log_enabled!(log::Level::Info) {
        info!("[node {}] checking node sync state", session.address());
    }

    while !is_synced(session).await? {
        if log::log_enabled!(log::Level::Warn) {
            warn!(
                "[node {}] node is not synced, waiting for sync before starting bridge",
                session.address()
            );
        }

        select! {
            biased;
            _ = shutdown.cancelled() => return Err(BridgeError::Cancelled),
            _ = sleep(SYNC_RETRY_INTERVAL) => {}
        }
    }

    if verbose && log::log_enabled!(log::Level::Info) {
        info!("[node {}] node synced, starting server", session.address());
    }

    Ok(())
}
