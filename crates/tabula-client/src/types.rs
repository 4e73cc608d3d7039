//! Types shared by the Tabula clients

use serde::{Deserialize, Serialize};

// ==================== Client configuration ====================

/// Content store (Kubo RPC) client configuration
#[derive(Debug, Clone)]
pub struct IpfsConfig {
    /// Base URL of the Kubo RPC API, without the `/api/v0` suffix
    pub api_url: String,
    /// Basic auth user (Infura-style project id)
    pub username: Option<String>,
    /// Basic auth secret
    pub password: Option<String>,
    /// Request timeout in seconds (default: 60)
    pub timeout_secs: u64,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5001".to_string(),
            username: None,
            password: None,
            timeout_secs: 60,
        }
    }
}

/// Remote pinning service client configuration
#[derive(Debug, Clone)]
pub struct PinningConfig {
    /// Which service flavour the endpoint speaks
    pub service: PinningService,
    /// API endpoint, defaults to the service's well-known endpoint when empty
    pub endpoint: String,
    /// Bearer token
    pub access_token: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            service: PinningService::Public,
            endpoint: String::new(),
            access_token: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Read-model (GraphQL index) client configuration
#[derive(Debug, Clone)]
pub struct SubgraphConfig {
    /// Full GraphQL endpoint URL
    pub endpoint: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for SubgraphConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/subgraphs/name/tabula".to_string(),
            timeout_secs: 30,
        }
    }
}

// ==================== Pinning ====================

/// Pinning services a user can configure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PinningService {
    Pinata,
    Estuary,
    Web3Storage,
    NftStorage,
    Custom,
    /// Content is kept fully on-chain, nothing to pin
    None,
    /// Rely on default public gateways
    Public,
}

impl PinningService {
    /// Well-known API endpoint for the service, empty for custom/none/public
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            PinningService::Pinata => "https://api.pinata.cloud",
            PinningService::Estuary => "https://api.estuary.tech/pinning",
            PinningService::Web3Storage => "https://api.web3.storage",
            PinningService::NftStorage => "https://api.nft.storage",
            PinningService::Custom | PinningService::None | PinningService::Public => "",
        }
    }

    /// Whether this service requires remote pin requests
    pub fn is_remote(&self) -> bool {
        !matches!(self, PinningService::None | PinningService::Public)
    }
}

impl std::fmt::Display for PinningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PinningService::Pinata => "PINATA",
            PinningService::Estuary => "ESTUARY",
            PinningService::Web3Storage => "WEB3_STORAGE",
            PinningService::NftStorage => "NFT_STORAGE",
            PinningService::Custom => "CUSTOM",
            PinningService::None => "NONE",
            PinningService::Public => "PUBLIC",
        };
        f.write_str(name)
    }
}

/// Pin status as reported by a pinning service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinStatus {
    Queued,
    Pinning,
    Pinned,
    Failed,
    /// The service has no record of the address
    Unknown,
}

impl PinStatus {
    pub fn from_service(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "queued" | "prechecking" | "searching" => PinStatus::Queued,
            "pinning" | "retrieving" => PinStatus::Pinning,
            "pinned" => PinStatus::Pinned,
            "failed" | "expired" => PinStatus::Failed,
            _ => PinStatus::Unknown,
        }
    }
}

// ==================== Content store ====================

/// Response from `/api/v0/add`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddResponse {
    /// File name as sent in the multipart body
    #[serde(default)]
    pub name: String,
    /// Content address (CIDv0 unless asked otherwise)
    pub hash: String,
    /// Cumulative size reported by the node
    #[serde(default)]
    pub size: String,
}

// ==================== Read-model entities ====================

/// How a read-model query may use cached answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestPolicy {
    /// Serve from the local response cache when possible
    #[default]
    CacheFirst,
    /// Always hit the index, then refresh the cache
    NetworkOnly,
}

/// Per-account permission row on a publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    pub address: String,
    pub article_create: bool,
    pub article_delete: bool,
    pub article_update: bool,
    pub publication_delete: bool,
    pub publication_permissions: bool,
    pub publication_update: bool,
}

/// Publication as materialized by the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: String,
    #[serde(default)]
    pub hash: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Unix seconds as a decimal string (GraphQL BigInt)
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub articles: Option<Vec<Article>>,
}

impl Publication {
    /// Permission row for an account, compared case-insensitively
    pub fn permission_for(&self, account: &str) -> Option<&Permission> {
        self.permissions
            .iter()
            .find(|p| p.address.eq_ignore_ascii_case(account))
    }
}

/// Parent publication embedded in an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleParent {
    pub id: String,
    #[serde(default)]
    pub hash: Option<String>,
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// Article as materialized by the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    /// Inline HTML or the content address of the body
    pub article: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub authors: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub posted_on: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub publication: Option<ArticleParent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinning_service_names() {
        let service: PinningService = serde_json::from_str("\"WEB3_STORAGE\"").unwrap();
        assert_eq!(service, PinningService::Web3Storage);
        assert_eq!(service.to_string(), "WEB3_STORAGE");
        assert!(service.is_remote());
        assert!(!PinningService::Public.is_remote());
        assert!(!PinningService::None.is_remote());
    }

    #[test]
    fn test_publication_deserialization() {
        let json = serde_json::json!({
            "id": "5-P-0xabc-0",
            "title": "My First Publication",
            "lastUpdated": "1700000000",
            "permissions": [{
                "id": "perm-1",
                "address": "0x89205a3a3b2a69de6dbf7f01ed13b2108b2c43e7",
                "articleCreate": true,
                "articleDelete": true,
                "articleUpdate": true,
                "publicationDelete": true,
                "publicationPermissions": true,
                "publicationUpdate": true
            }]
        });

        let publication: Publication = serde_json::from_value(json).unwrap();
        assert_eq!(publication.last_updated.as_deref(), Some("1700000000"));
        assert!(publication
            .permission_for("0x89205A3A3b2A69De6Dbf7f01ED13B2108B2c43e7")
            .is_some());
        assert!(publication.articles.is_none());
    }

    #[test]
    fn test_pin_status_mapping() {
        assert_eq!(PinStatus::from_service("pinned"), PinStatus::Pinned);
        assert_eq!(PinStatus::from_service("prechecking"), PinStatus::Queued);
        assert_eq!(PinStatus::from_service("whatever"), PinStatus::Unknown);
    }
}
