//! Hash Chain
//!
//! Tamper-evident display chain for the bread supply chain. Every stage is
//! hashed together with the hash of the stage before it, so editing any
//! stage changes its hash and every hash after it.
//!
//! **Components:**
//! - `stage`: stage records with ordered fields
//! - `chain`: block hashing, chain building and verification
//! - `dataset`: the six published stages
//! - `snapshot`: the static JSON file served to the viewer

pub mod chain;
pub mod dataset;
pub mod error;
pub mod snapshot;
pub mod stage;

pub use chain::{block_hash, build_chain, verify_chain, ChainLink, GENESIS_PREVIOUS_HASH};
pub use dataset::bread_supply_chain;
pub use error::{ChainError, Result};
pub use snapshot::{ChainSnapshot, SnapshotMetadata, SNAPSHOT_VERSION};
pub use stage::{StageFields, StageRecord};
