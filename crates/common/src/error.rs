use thiserror::Error;

use crate::{Address, ContentHash, Role};

#[derive(Error, Debug)]
pub enum Error {
    #[error("already registered: {0}")]
    AlreadyRegistered(ContentHash),

    #[error("account {account} is missing role {role}")]
    Unauthorized { account: Address, role: Role },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Chain unavailable: {0}")]
    TransientChain(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Only ledger availability problems are worth retrying; everything else
    /// needs the caller to change something first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransientChain(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
