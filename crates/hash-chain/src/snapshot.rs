//! Static chain file consumed by the read-only viewer
//!
//! Layout: `{blockchain: [link...], metadata: {generatedAt, totalBlocks, version}}`

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::chain::{build_chain, verify_chain, ChainLink};
use crate::error::{ChainError, Result};
use crate::stage::StageRecord;

pub const SNAPSHOT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// ISO 8601 with millisecond precision, UTC
    pub generated_at: String,
    pub total_blocks: usize,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub blockchain: Vec<ChainLink>,
    pub metadata: SnapshotMetadata,
}

impl ChainSnapshot {
    /// Build the chain for `records` and stamp it
    pub fn generate(records: &[StageRecord], generated_at: DateTime<Utc>) -> Result<Self> {
        let blockchain = build_chain(records)?;

        Ok(Self {
            metadata: SnapshotMetadata {
                generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                total_blocks: blockchain.len(),
                version: SNAPSHOT_VERSION.to_string(),
            },
            blockchain,
        })
    }

    /// Check the metadata count and every link of the chain
    pub fn verify(&self) -> Result<()> {
        if self.metadata.total_blocks != self.blockchain.len() {
            return Err(ChainError::BlockCountMismatch {
                declared: self.metadata.total_blocks,
                actual: self.blockchain.len(),
            });
        }
        verify_chain(&self.blockchain)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write as pretty JSON, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json_pretty()?)?;

        info!(
            "Wrote {} blocks to {}",
            self.metadata.total_blocks,
            path.display()
        );
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
