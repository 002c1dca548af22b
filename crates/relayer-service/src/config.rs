//! Configuration management for the relayer
//!
//! Loads configuration from environment variables with sensible defaults.
//! Without both `RPC_URL` and `RELAYER_ADDRESS` the relayer runs in mock mode.

use anyhow::{Context, Result};
use provenance_common::Address;
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Registry node endpoint
    pub rpc_url: Option<String>,

    /// Account the relayer submits as; must hold the relayer role
    pub relayer_address: Option<Address>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let relayer_address = match env::var("RELAYER_ADDRESS") {
            Ok(raw) if !raw.trim().is_empty() => {
                Some(Address::parse(raw.trim()).context("Invalid RELAYER_ADDRESS")?)
            }
            _ => None,
        };

        let config = Config {
            api_host: env::var("RELAYER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            api_port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .context("Invalid PORT")?,

            rpc_url: env::var("RPC_URL").ok().filter(|url| !url.trim().is_empty()),

            relayer_address,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("PORT must be greater than 0");
        }

        if let Some(address) = &self.relayer_address {
            if address.is_zero() {
                anyhow::bail!("RELAYER_ADDRESS cannot be the zero address");
            }
        }

        if let Some(url) = &self.rpc_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("RPC_URL must be an http(s) URL");
            }
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
