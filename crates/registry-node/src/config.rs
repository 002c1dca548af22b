//! Configuration management for the registry node
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use provenance_common::Address;
use std::env;

/// Which store backs the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Redis,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "redis" => Ok(StorageBackend::Redis),
            other => anyhow::bail!("Unknown STORAGE_BACKEND: {} (expected memory/redis)", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Deployer account; becomes admin and first relayer
    pub admin: Address,

    pub storage_backend: StorageBackend,

    /// Redis connection URL (required for the redis backend)
    pub redis_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let admin = env::var("REGISTRY_ADMIN").context("REGISTRY_ADMIN is required")?;

        let config = Config {
            api_host: env::var("REGISTRY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            api_port: env::var("REGISTRY_PORT")
                .unwrap_or_else(|_| "8545".to_string())
                .parse()
                .context("Invalid REGISTRY_PORT")?,

            admin: Address::parse(&admin).context("Invalid REGISTRY_ADMIN")?,

            storage_backend: env::var("STORAGE_BACKEND")
                .unwrap_or_else(|_| "memory".to_string())
                .parse()?,

            redis_url: env::var("REDIS_URL").ok(),
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("REGISTRY_PORT must be greater than 0");
        }

        if self.admin.is_zero() {
            anyhow::bail!("REGISTRY_ADMIN cannot be the zero address");
        }

        if self.storage_backend == StorageBackend::Redis && self.redis_url.is_none() {
            anyhow::bail!("REDIS_URL is required when STORAGE_BACKEND=redis");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
