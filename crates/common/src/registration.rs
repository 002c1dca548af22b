use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Address, ContentHash, Error, Result};

/// Stored registration for a content hash.
///
/// The default value (zero reporter, zero timestamp, empty CID) is what a
/// lookup of an unknown hash returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub reporter: Address,

    /// Block time in Unix seconds
    pub timestamp: u64,

    pub ipfs_cid: String,
}

impl Registration {
    pub fn exists(&self) -> bool {
        self.timestamp > 0
    }
}

/// Emitted once per successful registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationEvent {
    pub hash: ContentHash,
    pub reporter: Address,
    pub ipfs_cid: String,
    pub timestamp: u64,
}

impl RegistrationEvent {
    pub fn registration(&self) -> Registration {
        Registration {
            reporter: self.reporter,
            timestamp: self.timestamp,
            ipfs_cid: self.ipfs_cid.clone(),
        }
    }
}

/// Permissions held by registry accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May grant and revoke roles
    Admin,
    /// May register hashes on behalf of other reporters
    Relayer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Relayer => "relayer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "relayer" => Ok(Role::Relayer),
            other => Err(Error::validation(format!("unknown role: {}", other))),
        }
    }
}
