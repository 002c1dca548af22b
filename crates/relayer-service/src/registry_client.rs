//! Client for the Registry Node

use provenance_common::{Address, ContentHash, Error, Registration, Result, Role};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

/// Header the registry node reads the calling account from
const CALLER_HEADER: &str = "x-caller-address";

/// Client for interacting with the registry node
pub struct RegistryClient {
    base_url: String,
    client: reqwest::Client,
}

/// Committed registration as reported by the node
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedRegistration {
    pub tx_hash: ContentHash,
    pub sequence: u64,
}

#[derive(Debug, Deserialize)]
struct RegistrationResponse {
    exists: bool,
    #[serde(flatten)]
    registration: Registration,
}

#[derive(Debug, Deserialize)]
struct ExistsResponse {
    registered: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleResponse {
    has_role: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

fn unreachable_node(err: reqwest::Error) -> Error {
    Error::TransientChain(format!("registry node unreachable: {}", err))
}

impl RegistryClient {
    /// Create a new registry client
    pub fn new(registry_url: String) -> Self {
        Self {
            base_url: registry_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit `registerByRelayer` as `relayer`
    pub async fn register_by_relayer(
        &self,
        relayer: &Address,
        hash: &ContentHash,
        reporter: &Address,
        ipfs_cid: &str,
    ) -> Result<CommittedRegistration> {
        let url = format!("{}/api/registrations/relayed", self.base_url);

        debug!("Submitting {} for {} to {}", hash, reporter, url);

        let response = self
            .client
            .post(&url)
            .header(CALLER_HEADER, relayer.to_checksum())
            .json(&serde_json::json!({
                "hash": hash,
                "reporter": reporter,
                "ipfsCid": ipfs_cid,
            }))
            .send()
            .await
            .map_err(unreachable_node)?;

        if !response.status().is_success() {
            return Err(error_from_response(response, hash, relayer).await);
        }

        response.json().await.map_err(|e| {
            Error::Internal(anyhow::anyhow!("Failed to parse registration response: {}", e))
        })
    }

    /// Registration details, `None` when the hash is unknown
    pub async fn registration(&self, hash: &ContentHash) -> Result<Option<Registration>> {
        let url = format!("{}/api/registrations/{}", self.base_url, hash);

        debug!("Fetching registration from registry: {}", url);

        let response = self.client.get(&url).send().await.map_err(unreachable_node)?;
        if !response.status().is_success() {
            return Err(error_from_response(response, hash, &Address::ZERO).await);
        }

        let body: RegistrationResponse = response.json().await.map_err(|e| {
            Error::Internal(anyhow::anyhow!("Failed to parse registration response: {}", e))
        })?;

        Ok(body.exists.then_some(body.registration))
    }

    pub async fn is_registered(&self, hash: &ContentHash) -> Result<bool> {
        let url = format!("{}/api/registrations/{}/exists", self.base_url, hash);

        let response = self.client.get(&url).send().await.map_err(unreachable_node)?;
        if !response.status().is_success() {
            return Err(error_from_response(response, hash, &Address::ZERO).await);
        }

        let body: ExistsResponse = response.json().await.map_err(|e| {
            Error::Internal(anyhow::anyhow!("Failed to parse exists response: {}", e))
        })?;
        Ok(body.registered)
    }

    pub async fn has_role(&self, role: Role, account: &Address) -> Result<bool> {
        let url = format!("{}/api/roles/{}/{}", self.base_url, role, account);

        let response = self.client.get(&url).send().await.map_err(unreachable_node)?;
        if !response.status().is_success() {
            return Err(Error::TransientChain(format!(
                "role lookup failed: {}",
                response.status()
            )));
        }

        let body: RoleResponse = response.json().await.map_err(|e| {
            Error::Internal(anyhow::anyhow!("Failed to parse role response: {}", e))
        })?;
        Ok(body.has_role)
    }

    /// Check if the registry node is healthy
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await.map_err(unreachable_node)?;
        Ok(response.status().is_success())
    }
}

/// Map a node error response back onto the error taxonomy
async fn error_from_response(
    response: reqwest::Response,
    hash: &ContentHash,
    caller: &Address,
) -> Error {
    let status = response.status();
    let message = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| status.to_string());

    match status {
        StatusCode::CONFLICT => Error::AlreadyRegistered(*hash),
        StatusCode::FORBIDDEN => Error::Unauthorized {
            account: *caller,
            role: Role::Relayer,
        },
        StatusCode::BAD_REQUEST => Error::Validation(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            Error::TransientChain(message)
        }
        _ => Error::Internal(anyhow::anyhow!("registry node returned {}: {}", status, message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_client_creation() {
        let client = RegistryClient::new("http://localhost:8545/".to_string());
        assert_eq!(client.base_url(), "http://localhost:8545");
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transient() {
        // Port 9 (discard) is essentially never listening on loopback
        let client = RegistryClient::new("http://127.0.0.1:9".to_string());
        let err = client
            .is_registered(&ContentHash::keccak256(b"x"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
