use serde::{Deserialize, Serialize};

use crate::{Address, ContentHash, RegistrationEvent};

/// Result of a committed registry state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Transaction reference assigned by the ledger
    pub tx_hash: ContentHash,

    /// Position of the transaction in the ledger's total order
    pub sequence: u64,

    pub event: RegistrationEvent,
}

impl Receipt {
    /// Derive the transaction reference for a registration.
    ///
    /// keccak-256 over `hash || reporter || sequence (big endian)`, so the
    /// same content registered at a different point in the ledger history
    /// gets a different reference.
    pub fn tx_hash_for(hash: &ContentHash, reporter: &Address, sequence: u64) -> ContentHash {
        let mut preimage = Vec::with_capacity(32 + 20 + 8);
        preimage.extend_from_slice(hash.as_bytes());
        preimage.extend_from_slice(reporter.as_bytes());
        preimage.extend_from_slice(&sequence.to_be_bytes());
        ContentHash::keccak256(preimage)
    }

    pub fn new(sequence: u64, event: RegistrationEvent) -> Self {
        Self {
            tx_hash: Self::tx_hash_for(&event.hash, &event.reporter, sequence),
            sequence,
            event,
        }
    }
}
