//! Submission strategies: live registry submission or mock
//!
//! The relayer picks one implementation at startup from its configuration
//! and never re-checks credentials per request.

use async_trait::async_trait;
use provenance_common::{Address, ContentHash, Registration, Result, Role};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::registry_client::RegistryClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitterMode {
    Live,
    Mock,
}

/// Outcome of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Committed on the registry
    Committed { tx_hash: ContentHash },
    /// Nothing was sent
    Mock,
}

#[async_trait]
pub trait Submitter: Send + Sync {
    fn mode(&self) -> SubmitterMode;

    /// Register `hash` on behalf of `reporter`
    async fn submit(&self, hash: ContentHash, reporter: Address, ipfs_cid: &str)
        -> Result<Submission>;

    /// Registration details; `None` when unknown or when nothing can be looked up
    async fn lookup(&self, hash: &ContentHash) -> Result<Option<Registration>>;

    /// Startup check of whatever the submitter depends on
    async fn preflight(&self) -> Result<()> {
        Ok(())
    }
}

/// Returns the computed hash without touching any chain
pub struct MockSubmitter;

#[async_trait]
impl Submitter for MockSubmitter {
    fn mode(&self) -> SubmitterMode {
        SubmitterMode::Mock
    }

    async fn submit(
        &self,
        hash: ContentHash,
        reporter: Address,
        _ipfs_cid: &str,
    ) -> Result<Submission> {
        info!("Mock mode: not submitting {} for {}", hash, reporter);
        Ok(Submission::Mock)
    }

    async fn lookup(&self, _hash: &ContentHash) -> Result<Option<Registration>> {
        Ok(None)
    }
}

/// Submits `registerByRelayer` calls to a registry node as the relayer account
pub struct LiveSubmitter {
    client: RegistryClient,
    relayer: Address,
}

impl LiveSubmitter {
    pub fn new(client: RegistryClient, relayer: Address) -> Self {
        Self { client, relayer }
    }

    pub fn relayer(&self) -> &Address {
        &self.relayer
    }
}

#[async_trait]
impl Submitter for LiveSubmitter {
    fn mode(&self) -> SubmitterMode {
        SubmitterMode::Live
    }

    async fn submit(
        &self,
        hash: ContentHash,
        reporter: Address,
        ipfs_cid: &str,
    ) -> Result<Submission> {
        let committed = self
            .client
            .register_by_relayer(&self.relayer, &hash, &reporter, ipfs_cid)
            .await?;

        info!(
            "Committed {} for {} (tx {}, sequence {})",
            hash, reporter, committed.tx_hash, committed.sequence
        );

        Ok(Submission::Committed {
            tx_hash: committed.tx_hash,
        })
    }

    async fn lookup(&self, hash: &ContentHash) -> Result<Option<Registration>> {
        self.client.registration(hash).await
    }

    /// Without the relayer role every submission would fail `Unauthorized`
    async fn preflight(&self) -> Result<()> {
        if !self.client.has_role(Role::Relayer, &self.relayer).await? {
            warn!(
                "Relayer account {} does not hold the relayer role on {}",
                self.relayer,
                self.client.base_url()
            );
        }
        Ok(())
    }
}

/// Pick the submitter for this configuration
pub fn submitter_from_config(config: &Config) -> Arc<dyn Submitter> {
    match (&config.rpc_url, &config.relayer_address) {
        (Some(rpc_url), Some(relayer)) => {
            info!("Relayer submitting to {} as {}", rpc_url, relayer);
            Arc::new(LiveSubmitter::new(
                RegistryClient::new(rpc_url.clone()),
                *relayer,
            ))
        }
        _ => {
            warn!("Relayer: set RPC_URL and RELAYER_ADDRESS to send transactions. Running in mock mode.");
            Arc::new(MockSubmitter)
        }
    }
}
