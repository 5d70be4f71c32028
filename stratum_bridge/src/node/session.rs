use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Error, Result};
use log::{debug, info, trace, warn};
use tokio::{
    sync::{Mutex, RwLock},
    time::timeout,
};

use super::{
    rpc::{NodeConnector, NodeRpc, NotificationHandler},
    types::{BlockDagInfo, BlockTemplate, GetInfoResult, Hash, HashrateEstimate},
};
use crate::error::BridgeError;

// Live link to the node.
// The client handle is swapped as a whole on reconnect: callers clone the
// current Arc for each request, so a request racing with a swap keeps using
// the previous handle and may fail with a transport error.
pub struct NodeSession<C: NodeConnector> {
    // node address, immutable after construction
    address: String,
    connector: C,
    // bound applied on each RPC call
    rpc_timeout: Option<Duration>,
    connected: AtomicBool,
    client: RwLock<Option<Arc<C::Client>>>,
    // kept to subscribe again when a fresh client is built
    notification_handler: Mutex<Option<NotificationHandler>>,
}

impl<C: NodeConnector> NodeSession<C> {
    // Create a session without connecting, first reconnect will build the client
    pub fn new<S: Into<String>>(address: S, connector: C, rpc_timeout: Option<Duration>) -> Self {
        Self {
            address: address.into(),
            connector,
            rpc_timeout,
            connected: AtomicBool::new(false),
            client: RwLock::new(None),
            notification_handler: Mutex::new(None),
        }
    }

    // Create a session and connect to the node right away
    pub async fn connect<S: Into<String>>(
        address: S,
        connector: C,
        rpc_timeout: Option<Duration>,
    ) -> Result<Self, BridgeError> {
        let session = Self::new(address, connector, rpc_timeout);
        let client = session.build_client().await?;
        *session.client.write().await = Some(Arc::new(client));
        session.connected.store(true, Ordering::SeqCst);

        if log::log_enabled!(log::Level::Info) {
            info!("[node {}] connected", session.address);
        }

        Ok(session)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn rpc_timeout(&self) -> Option<Duration> {
        self.rpc_timeout
    }

    // Is a client handle current and did the last reconnect succeed
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    // Current client handle
    pub async fn client(&self) -> Result<Arc<C::Client>, BridgeError> {
        self.client
            .read()
            .await
            .as_ref()
            .cloned()
            .ok_or(BridgeError::NotConnected)
    }

    // Drop the current client handle
    // In-flight requests keep their own reference and finish on it
    pub async fn disconnect(&self) -> bool {
        trace!("disconnect");
        let previous = self.client.write().await.take();
        self.connected.store(false, Ordering::SeqCst);
        if previous.is_some() && log::log_enabled!(log::Level::Debug) {
            debug!("[node {}] client handle dropped", self.address);
        }
        previous.is_some()
    }

    // Re-establish the link, exactly one attempt
    // An existing client reconnects in place, otherwise a new one is built
    pub async fn reconnect(&self) -> Result<(), BridgeError> {
        trace!("reconnect");
        let current = self.client.read().await.as_ref().cloned();
        let res = match current {
            Some(client) => self
                .bounded("reconnect", client.reconnect())
                .await
                .map_err(|source| BridgeError::Reconnect {
                    address: self.address.clone(),
                    source,
                }),
            None => self.replace_client().await,
        };

        self.connected.store(res.is_ok(), Ordering::SeqCst);
        if res.is_ok() && log::log_enabled!(log::Level::Info) {
            info!("[node {}] reconnected", self.address);
        }

        res
    }

    async fn build_client(&self) -> Result<C::Client, BridgeError> {
        self.bounded("connect", self.connector.connect(&self.address))
            .await
            .map_err(|source| BridgeError::Connect {
                address: self.address.clone(),
                source,
            })
    }

    // Build a fresh client, subscribe it again and make it the current one
    async fn replace_client(&self) -> Result<(), BridgeError> {
        let client = Arc::new(self.build_client().await?);

        let handler = self.notification_handler.lock().await.clone();
        if let Some(handler) = handler {
            if let Err(e) = self
                .bounded(
                    "register_for_new_block_template_notifications",
                    client.register_for_new_block_template_notifications(handler),
                )
                .await
            {
                if log::log_enabled!(log::Level::Warn) {
                    warn!(
                        "[node {}] failed to subscribe again to block template notifications: {:#}",
                        self.address, e
                    );
                }
            }
        }

        *self.client.write().await = Some(client);
        Ok(())
    }

    // Apply the configured per call bound
    async fn bounded<T, F>(&self, method: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.rpc_timeout {
            Some(duration) => timeout(duration, future)
                .await
                .map_err(|_| BridgeError::Timeout {
                    method,
                    timeout: duration,
                })?,
            None => future.await,
        }
    }

    async fn current(&self) -> Result<Arc<C::Client>> {
        self.client().await.map_err(Error::from)
    }

    pub async fn get_info(&self) -> Result<GetInfoResult> {
        trace!("get_info");
        let client = self.current().await?;
        self.bounded("get_info", client.get_info()).await
    }

    pub async fn get_block_dag_info(&self) -> Result<BlockDagInfo> {
        trace!("get_block_dag_info");
        let client = self.current().await?;
        self.bounded("get_block_dag_info", client.get_block_dag_info())
            .await
    }

    pub async fn estimate_network_hashes_per_second(
        &self,
        start_hash: &Hash,
        window_size: u32,
    ) -> Result<HashrateEstimate> {
        trace!("estimate_network_hashes_per_second");
        let client = self.current().await?;
        self.bounded(
            "estimate_network_hashes_per_second",
            client.estimate_network_hashes_per_second(start_hash, window_size),
        )
        .await
    }

    pub async fn get_block_template(
        &self,
        pay_address: &str,
        extra_data: &str,
    ) -> Result<BlockTemplate> {
        trace!("get_block_template");
        let client = self.current().await?;
        self.bounded(
            "get_block_template",
            client.get_block_template(pay_address, extra_data),
        )
        .await
    }

    // Subscribe to new block template notifications
    // The handler is kept even on failure so a future fresh client gets it
    pub async fn register_for_new_block_template_notifications(
        &self,
        handler: NotificationHandler,
    ) -> Result<(), BridgeError> {
        trace!("register_for_new_block_template_notifications");
        *self.notification_handler.lock().await = Some(handler.clone());

        let client = self.client().await?;
        self.bounded(
            "register_for_new_block_template_notifications",
            client.register_for_new_block_template_notifications(handler),
        )
        .await
        .map_err(BridgeError::Subscription)
    }
}
