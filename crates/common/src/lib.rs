//! Shared types for the provenance registry, relayer and hash-chain tools.

pub mod address;
pub mod canonical;
pub mod error;
pub mod hash;
pub mod receipt;
pub mod registration;

pub use address::Address;
pub use canonical::{canonical_json, payload_hash};
pub use error::{Error, Result};
pub use hash::ContentHash;
pub use receipt::Receipt;
pub use registration::{Registration, RegistrationEvent, Role};
