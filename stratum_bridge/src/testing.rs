// Scripted node used by the unit tests
#![allow(clippy::disallowed_methods)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::{
    node::{
        BlockDagInfo, BlockTemplate, GetInfoResult, Hash, HashrateEstimate, NodeConnector,
        NodeRpc, NodeSession, NotificationHandler,
    },
    stats::{NetworkStats, StatsSink},
};

pub const TEST_ADDRESS: &str = "127.0.0.1:8080";

// Shared by every client built from the same connector
pub struct MockState {
    // answer used once the script is empty
    pub synced: AtomicBool,
    sync_script: Mutex<VecDeque<Result<bool, &'static str>>>,
    pub fail_info: AtomicBool,
    pub hang_info: AtomicBool,
    pub fail_connect: AtomicBool,
    pub fail_reconnect: AtomicBool,
    pub fail_register: AtomicBool,
    pub fail_dag: AtomicBool,
    pub fail_hashrate: AtomicBool,
    pub fail_template: AtomicBool,
    pub tips: Mutex<Vec<Hash>>,

    pub info_calls: AtomicUsize,
    pub connect_calls: AtomicUsize,
    pub reconnect_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub dag_calls: AtomicUsize,
    pub hashrate_calls: AtomicUsize,
    pub template_calls: AtomicUsize,

    pub last_hashrate_request: Mutex<Option<(Hash, u32)>>,
    pub last_template_request: Mutex<Option<(String, String)>>,
    handler: Mutex<Option<NotificationHandler>>,
}

impl MockState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            synced: AtomicBool::new(true),
            sync_script: Mutex::new(VecDeque::new()),
            fail_info: AtomicBool::new(false),
            hang_info: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            fail_reconnect: AtomicBool::new(false),
            fail_register: AtomicBool::new(false),
            fail_dag: AtomicBool::new(false),
            fail_hashrate: AtomicBool::new(false),
            fail_template: AtomicBool::new(false),
            tips: Mutex::new(vec![Hash::new([7; 32]), Hash::new([8; 32])]),
            info_calls: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
            reconnect_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            dag_calls: AtomicUsize::new(0),
            hashrate_calls: AtomicUsize::new(0),
            template_calls: AtomicUsize::new(0),
            last_hashrate_request: Mutex::new(None),
            last_template_request: Mutex::new(None),
            handler: Mutex::new(None),
        })
    }

    // Queue answers for the next get_info calls
    pub fn script_sync<I>(&self, answers: I)
    where
        I: IntoIterator<Item = Result<bool, &'static str>>,
    {
        self.sync_script.lock().unwrap().extend(answers);
    }

    // Simulate a new block template notification pushed by the node
    pub fn notify(&self) -> bool {
        let handler = self.handler.lock().unwrap().clone();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().unwrap().is_some()
    }
}

pub struct MockNode {
    state: Arc<MockState>,
}

#[async_trait]
impl NodeRpc for MockNode {
    async fn get_info(&self) -> Result<GetInfoResult> {
        self.state.info_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.hang_info.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let scripted = self.state.sync_script.lock().unwrap().pop_front();
        let is_synced = match scripted {
            Some(Ok(synced)) => synced,
            Some(Err(e)) => return Err(anyhow!(e)),
            None if self.state.fail_info.load(Ordering::SeqCst) => {
                return Err(anyhow!("connection refused"))
            }
            None => self.state.synced.load(Ordering::SeqCst),
        };

        Ok(GetInfoResult {
            is_synced,
            version: "1.0.0".to_owned(),
        })
    }

    async fn get_block_dag_info(&self) -> Result<BlockDagInfo> {
        self.state.dag_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_dag.load(Ordering::SeqCst) {
            return Err(anyhow!("dag info unavailable"));
        }

        Ok(BlockDagInfo {
            tip_hashes: self.state.tips.lock().unwrap().clone(),
            block_count: 4200,
            difficulty: 1_500_000.5,
        })
    }

    async fn estimate_network_hashes_per_second(
        &self,
        start_hash: &Hash,
        window_size: u32,
    ) -> Result<HashrateEstimate> {
        self.state.hashrate_calls.fetch_add(1, Ordering::SeqCst);
        *self.state.last_hashrate_request.lock().unwrap() = Some((*start_hash, window_size));
        if self.state.fail_hashrate.load(Ordering::SeqCst) {
            return Err(anyhow!("hashrate estimation failed"));
        }

        Ok(HashrateEstimate {
            network_hashes_per_second: 25_000.0,
        })
    }

    async fn get_block_template(
        &self,
        pay_address: &str,
        extra_data: &str,
    ) -> Result<BlockTemplate> {
        self.state.template_calls.fetch_add(1, Ordering::SeqCst);
        *self.state.last_template_request.lock().unwrap() =
            Some((pay_address.to_owned(), extra_data.to_owned()));
        if self.state.fail_template.load(Ordering::SeqCst) {
            return Err(anyhow!("node is busy"));
        }

        Ok(BlockTemplate {
            template: "00".repeat(112),
            height: 4200,
            difficulty: "1500000".to_owned(),
            is_synced: true,
        })
    }

    async fn register_for_new_block_template_notifications(
        &self,
        handler: NotificationHandler,
    ) -> Result<()> {
        self.state.register_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_register.load(Ordering::SeqCst) {
            return Err(anyhow!("notifications not supported"));
        }

        *self.state.handler.lock().unwrap() = Some(handler);
        Ok(())
    }

    async fn reconnect(&self) -> Result<()> {
        self.state.reconnect_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_reconnect.load(Ordering::SeqCst) {
            return Err(anyhow!("node unreachable"));
        }

        Ok(())
    }
}

pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    pub fn new(state: Arc<MockState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl NodeConnector for MockConnector {
    type Client = MockNode;

    async fn connect(&self, _address: &str) -> Result<MockNode> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(anyhow!("node unreachable"));
        }

        Ok(MockNode {
            state: self.state.clone(),
        })
    }
}

pub async fn connected_session(state: &Arc<MockState>) -> NodeSession<MockConnector> {
    NodeSession::connect(
        TEST_ADDRESS,
        MockConnector::new(state.clone()),
        Some(Duration::from_secs(30)),
    )
    .await
    .unwrap()
}

// Keeps every sample for inspection
#[derive(Default)]
pub struct RecordingSink {
    samples: Mutex<Vec<NetworkStats>>,
}

impl RecordingSink {
    pub fn samples(&self) -> Vec<NetworkStats> {
        self.samples.lock().unwrap().clone()
    }
}

impl StatsSink for RecordingSink {
    fn record_network_stats(&self, stats: &NetworkStats) {
        self.samples.lock().unwrap().push(*stats);
    }
}
