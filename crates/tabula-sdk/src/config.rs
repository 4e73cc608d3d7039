//! Tabula configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! configuration for a local IPFS node with public gateway availability.

use crate::address::DEFAULT_GATEWAY;
use crate::error::{Result, TabulaError};
use crate::network::{default_networks, Network, NetworkRegistry};
use crate::publisher::ReadModels;
use crate::reconcile::ReconcilerConfig;
use crate::submit::SubmitterConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tabula_client::{IpfsConfig, PinningConfig, PinningService, SubgraphClient, SubgraphConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ipfs: IpfsSection,
    #[serde(default)]
    pub pinning: PinningSection,
    #[serde(default)]
    pub chain: ChainSection,
    #[serde(default)]
    pub index: IndexSection,
    #[serde(default = "default_networks")]
    pub networks: Vec<Network>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ipfs: IpfsSection::default(),
            pinning: PinningSection::default(),
            chain: ChainSection::default(),
            index: IndexSection::default(),
            networks: default_networks(),
        }
    }
}

/// Content store (IPFS HTTP API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpfsSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Prefix used to display stored media; also recognized when lifting
    /// media out of rich text
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    #[serde(default = "default_decode_timeout")]
    pub decode_timeout_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Basic auth credentials (e.g. an Infura project id and secret)
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for IpfsSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            gateway_url: default_gateway_url(),
            decode_timeout_secs: default_decode_timeout(),
            request_timeout_secs: default_request_timeout(),
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinningSection {
    #[serde(default = "default_pinning_service")]
    pub service: PinningService,

    /// Empty selects the service's well-known endpoint
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub access_token: String,
}

impl Default for PinningSection {
    fn default() -> Self {
        Self {
            service: default_pinning_service(),
            endpoint: String::new(),
            access_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSection {
    /// Post log contract; submissions fail with `ContractUnavailable` while unset
    #[serde(default)]
    pub contract_address: Option<String>,

    #[serde(default = "default_post_tag")]
    pub post_tag: String,

    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            contract_address: None,
            post_tag: default_post_tag(),
            confirmation_timeout_secs: default_confirmation_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSection {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// 0 waits for the index without bound
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,

    #[serde(default = "default_subgraph_base_url")]
    pub subgraph_base_url: String,
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_wait_secs: default_max_wait(),
            subgraph_base_url: default_subgraph_base_url(),
        }
    }
}

// Defaults
fn default_api_url() -> String { "http://localhost:5001".to_string() }
fn default_gateway_url() -> String { DEFAULT_GATEWAY.to_string() }
fn default_decode_timeout() -> u64 { 30 }
fn default_request_timeout() -> u64 { 60 }
fn default_pinning_service() -> PinningService { PinningService::Public }
fn default_post_tag() -> String { crate::submit::submitter::DEFAULT_POST_TAG.to_string() }
fn default_confirmation_timeout() -> u64 { 300 }
fn default_poll_interval() -> u64 { 5000 }
fn default_max_wait() -> u64 { 600 }
fn default_subgraph_base_url() -> String { "http://localhost:8000/subgraphs/name".to_string() }

impl Config {
    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TabulaError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pinning.service.is_remote() {
            let endpoint = self.pinning_endpoint();
            if endpoint.is_empty() {
                return Err(TabulaError::Config(format!(
                    "pinning service {} needs an endpoint",
                    self.pinning.service
                )));
            }
            if self.pinning.access_token.trim().is_empty() {
                return Err(TabulaError::Config(format!(
                    "pinning service {} needs an access token",
                    self.pinning.service
                )));
            }
        }

        if self.index.poll_interval_ms == 0 {
            return Err(TabulaError::Config("index.poll_interval_ms must be greater than 0".into()));
        }

        let mut seen = HashSet::new();
        for network in &self.networks {
            if !seen.insert(network.chain_id) {
                return Err(TabulaError::Config(format!(
                    "network chain id {} is configured twice",
                    network.chain_id
                )));
            }
        }

        Ok(())
    }

    fn pinning_endpoint(&self) -> &str {
        if self.pinning.endpoint.trim().is_empty() {
            self.pinning.service.default_endpoint()
        } else {
            &self.pinning.endpoint
        }
    }

    pub fn ipfs_client_config(&self) -> IpfsConfig {
        IpfsConfig {
            api_url: self.ipfs.api_url.clone(),
            username: self.ipfs.username.clone(),
            password: self.ipfs.password.clone(),
            timeout_secs: self.ipfs.request_timeout_secs,
        }
    }

    pub fn pinning_client_config(&self) -> PinningConfig {
        PinningConfig {
            service: self.pinning.service,
            endpoint: self.pinning_endpoint().to_string(),
            access_token: self.pinning.access_token.clone(),
            ..Default::default()
        }
    }

    /// Index client for the network of `chain_id`
    pub fn subgraph_client_config(&self, chain_id: u64) -> Result<SubgraphConfig> {
        let endpoint = self
            .network_registry()
            .subgraph_endpoint(chain_id)
            .ok_or_else(|| TabulaError::Config("no networks configured".into()))?;
        Ok(SubgraphConfig {
            endpoint,
            ..Default::default()
        })
    }

    /// One index client per configured network
    pub fn read_models(&self) -> Result<ReadModels> {
        let mut read_models = ReadModels::new();
        for network in &self.networks {
            let client = SubgraphClient::new(self.subgraph_client_config(network.chain_id)?)
                .map_err(TabulaError::from_read_model)?;
            read_models.insert(network.chain_id, Arc::new(client));
        }
        Ok(read_models)
    }

    pub fn decode_timeout(&self) -> Duration {
        Duration::from_secs(self.ipfs.decode_timeout_secs)
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            poll_interval: Duration::from_millis(self.index.poll_interval_ms),
            max_wait: match self.index.max_wait_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }

    pub fn submitter_config(&self) -> SubmitterConfig {
        SubmitterConfig {
            contract_address: self.chain.contract_address.clone(),
            post_tag: self.chain.post_tag.clone(),
            confirmation_timeout: Duration::from_secs(self.chain.confirmation_timeout_secs),
        }
    }

    pub fn network_registry(&self) -> NetworkRegistry {
        NetworkRegistry::new(self.index.subgraph_base_url.clone(), self.networks.clone())
    }

    /// Display prefixes lifted out of rich text: the configured gateway, and
    /// the public one editors embed by default
    pub fn display_prefixes(&self) -> Vec<String> {
        let mut prefixes = vec![crate::address::normalize_gateway(&self.ipfs.gateway_url)];
        if !prefixes.iter().any(|p| p == DEFAULT_GATEWAY) {
            prefixes.push(DEFAULT_GATEWAY.to_string());
        }
        prefixes
    }
}
