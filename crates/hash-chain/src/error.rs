use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("stage {index}: invalid timestamp {value:?} (expected RFC 3339)")]
    InvalidTimestamp { index: u64, value: String },

    #[error("duplicate field {0:?}")]
    DuplicateField(String),

    #[error("block {index}: previousHash does not match the preceding block")]
    BrokenLink { index: u64 },

    #[error("block {index}: stored hash {stored} does not match computed {computed}")]
    HashMismatch {
        index: u64,
        stored: String,
        computed: String,
    },

    #[error("metadata declares {declared} blocks but the file holds {actual}")]
    BlockCountMismatch { declared: usize, actual: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChainError>;
