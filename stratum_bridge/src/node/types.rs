use std::fmt::{self, Debug, Display, Formatter};

use serde::{Deserialize, Serialize};

pub const HASH_SIZE: usize = 32;

// Identifier of a block in the DAG, hex encoded on the wire
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash(#[serde(with = "hex::serde")] [u8; HASH_SIZE]);

impl Hash {
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub const fn zero() -> Self {
        Self([0; HASH_SIZE])
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetInfoResult {
    pub is_synced: bool,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDagInfo {
    // Current frontier of the DAG, the first one is used to anchor hashrate estimations
    pub tip_hashes: Vec<Hash>,
    pub block_count: u64,
    pub difficulty: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HashrateEstimate {
    pub network_hashes_per_second: f64,
}

// Candidate block returned by the node, opaque for the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTemplate {
    pub template: String,
    pub height: u64,
    pub difficulty: String,
    #[serde(default)]
    pub is_synced: bool,
}

// Miner requesting a block template through the stratum side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerIdentity {
    // Address receiving the block reward
    pub wallet_address: String,
    // Application name declared by the miner at subscription
    pub remote_app: String,
}

impl MinerIdentity {
    pub fn new<A: Into<String>, B: Into<String>>(wallet_address: A, remote_app: B) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            remote_app: remote_app.into(),
        }
    }
}
