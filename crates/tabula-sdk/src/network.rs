//! Supported networks
//!
//! Each chain has its own index deployment. The endpoint is looked up by
//! chain id whenever a client is needed; nothing is switched globally.

use crate::submit::LogEntryId;
use serde::{Deserialize, Serialize};

/// Chain used when a chain id is unknown
pub const FALLBACK_CHAIN_ID: u64 = 11155111;

/// Explorer used when a network has none configured
pub const DEFAULT_EXPLORER_URL: &str = "https://etherscan.io/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub chain_id: u64,
    pub name: String,
    /// Path of the index deployment under the subgraph base URL
    pub subgraph_path: String,
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
}

fn default_explorer_url() -> String {
    DEFAULT_EXPLORER_URL.to_string()
}

impl Network {
    fn new(chain_id: u64, name: &str, explorer_url: &str) -> Self {
        Self {
            chain_id,
            name: name.to_string(),
            subgraph_path: format!("tabula-{}", name),
            explorer_url: explorer_url.to_string(),
        }
    }
}

/// Networks Tabula is deployed on
pub fn default_networks() -> Vec<Network> {
    vec![
        Network::new(1, "mainnet", "https://etherscan.io/"),
        Network::new(10, "optimism", "https://optimistic.etherscan.io/"),
        Network::new(100, "gnosis", "https://gnosisscan.io/"),
        Network::new(137, "polygon", "https://polygonscan.com/"),
        Network::new(42161, "arbitrum", "https://arbiscan.io/"),
        Network::new(11155111, "sepolia", "https://sepolia.etherscan.io/"),
    ]
}

/// Chain id to network lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRegistry {
    subgraph_base_url: String,
    networks: Vec<Network>,
}

impl NetworkRegistry {
    pub fn new(subgraph_base_url: impl Into<String>, networks: Vec<Network>) -> Self {
        Self {
            subgraph_base_url: subgraph_base_url.into(),
            networks,
        }
    }

    pub fn with_defaults(subgraph_base_url: impl Into<String>) -> Self {
        Self::new(subgraph_base_url, default_networks())
    }

    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    pub fn get(&self, chain_id: u64) -> Option<&Network> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }

    pub fn is_supported(&self, chain_id: u64) -> bool {
        self.get(chain_id).is_some()
    }

    /// Network for `chain_id`, falling back to sepolia for unknown chains
    pub fn resolve(&self, chain_id: u64) -> Option<&Network> {
        self.get(chain_id)
            .or_else(|| self.get(FALLBACK_CHAIN_ID))
            .or_else(|| self.networks.first())
    }

    /// GraphQL endpoint of the index for `chain_id`
    pub fn subgraph_endpoint(&self, chain_id: u64) -> Option<String> {
        self.resolve(chain_id).map(|network| {
            format!(
                "{}/{}",
                self.subgraph_base_url.trim_end_matches('/'),
                network.subgraph_path.trim_start_matches('/')
            )
        })
    }

    /// Index endpoint for the chain an entity was written on
    pub fn subgraph_endpoint_for(&self, id: &LogEntryId) -> Option<String> {
        self.subgraph_endpoint(id.chain_id())
    }

    /// Block explorer link for a transaction
    pub fn transaction_url(&self, chain_id: u64, transaction_hash: &str) -> String {
        let explorer = self
            .get(chain_id)
            .map(|n| n.explorer_url.as_str())
            .unwrap_or(DEFAULT_EXPLORER_URL);
        format!("{}/tx/{}", explorer.trim_end_matches('/'), transaction_hash)
    }
}
