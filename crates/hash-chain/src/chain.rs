//! Hash-chain construction and verification
//!
//! Each block hash is `SHA-256(JSON({index, timestamp, data, previousHash}))`
//! rendered as lowercase hex. The JSON is compact, keeps the field order
//! above and the record's own field order inside `data`, and leaves
//! non-ASCII text unescaped. Generation and verification both go through
//! [`block_hash`], so a precomputed chain and a recomputed one agree byte
//! for byte.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{ChainError, Result};
use crate::stage::{StageFields, StageRecord};

/// Previous hash of the first block
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// A stage record linked into the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    #[serde(flatten)]
    pub record: StageRecord,

    #[serde(rename = "previousHash")]
    pub previous_hash: String,

    pub hash: String,
}

#[derive(Serialize)]
struct HashInput<'a> {
    index: u64,
    timestamp: &'a str,
    data: &'a StageFields,
    #[serde(rename = "previousHash")]
    previous_hash: &'a str,
}

/// The exact bytes that get hashed for `record`
pub fn hash_preimage(record: &StageRecord, previous_hash: &str) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&HashInput {
        index: record.index,
        timestamp: &record.timestamp,
        data: &record.data,
        previous_hash,
    })?)
}

pub fn block_hash(record: &StageRecord, previous_hash: &str) -> Result<String> {
    let preimage = hash_preimage(record, previous_hash)?;
    Ok(hex::encode(Sha256::digest(&preimage)))
}

/// Link `records` in order, starting from [`GENESIS_PREVIOUS_HASH`]
pub fn build_chain(records: &[StageRecord]) -> Result<Vec<ChainLink>> {
    let mut previous_hash = GENESIS_PREVIOUS_HASH.to_string();
    let mut chain = Vec::with_capacity(records.len());

    for record in records {
        let hash = block_hash(record, &previous_hash)?;
        debug!("Block #{} {}: {}", record.index, record.title, hash);

        chain.push(ChainLink {
            record: record.clone(),
            previous_hash: std::mem::replace(&mut previous_hash, hash.clone()),
            hash,
        });
    }

    Ok(chain)
}

/// Recompute every hash and check each link points at its predecessor.
///
/// Fails on the first inconsistent block.
pub fn verify_chain(chain: &[ChainLink]) -> Result<()> {
    let mut expected_previous = GENESIS_PREVIOUS_HASH;

    for link in chain {
        if link.previous_hash != expected_previous {
            return Err(ChainError::BrokenLink {
                index: link.record.index,
            });
        }

        let computed = block_hash(&link.record, &link.previous_hash)?;
        if computed != link.hash {
            return Err(ChainError::HashMismatch {
                index: link.record.index,
                stored: link.hash.clone(),
                computed,
            });
        }

        expected_previous = link.hash.as_str();
    }

    Ok(())
}
