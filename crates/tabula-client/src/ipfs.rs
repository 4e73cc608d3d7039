//! HTTP client for a Kubo-compatible content store RPC API

use crate::error::{ClientError, Result};
use crate::types::{AddResponse, IpfsConfig};
use base64::Engine;
use reqwest::{header, multipart, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Error body returned by Kubo on non-2xx responses
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RpcError {
    message: String,
}

/// Client for the content store's `/api/v0` RPC surface
///
/// # Example
///
/// ```rust,no_run
/// use tabula_client::{IpfsClient, IpfsConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = IpfsClient::new(IpfsConfig::default())?;
/// let added = client.add(b"<p>hello</p>").await?;
/// let bytes = client.cat(&added.hash).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct IpfsClient {
    config: IpfsConfig,
    client: Client,
}

impl IpfsClient {
    /// Create a new content store client
    pub fn new(config: IpfsConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref user) = config.username {
            let secret = config.password.clone().unwrap_or_default();
            let token = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, secret));
            let value = header::HeaderValue::from_str(&format!("Basic {}", token))
                .map_err(|e| ClientError::Config(format!("invalid credentials: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Base URL this client talks to
    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    fn rpc_url(&self, command: &str) -> String {
        format!("{}/api/v0/{}", self.config.api_url.trim_end_matches('/'), command)
    }

    /// Add content, returning its CIDv0 address
    pub async fn add(&self, data: &[u8]) -> Result<AddResponse> {
        let url = format!("{}?cid-version=0&pin=false", self.rpc_url("add"));
        let part = multipart::Part::bytes(data.to_vec()).file_name("content");
        let form = multipart::Form::new().part("file", part);

        let response = self.client.post(&url).multipart(form).send().await?;
        let added: AddResponse = self.handle_response(response, "add").await?;
        tracing::debug!(hash = %added.hash, bytes = data.len(), "Added content");
        Ok(added)
    }

    /// Read the full content behind an address
    pub async fn cat(&self, address: &str) -> Result<Vec<u8>> {
        let url = format!("{}?arg={}", self.rpc_url("cat"), urlencoding::encode(address));
        let response = self.client.post(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::rpc_failure(response, address).await);
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Pin an address on the node itself
    pub async fn pin_add(&self, address: &str) -> Result<()> {
        let url = format!("{}?arg={}", self.rpc_url("pin/add"), urlencoding::encode(address));
        let response = self.client.post(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::rpc_failure(response, address).await);
        }
        Ok(())
    }

    /// Node version string; also tells whether the node is reachable
    pub async fn version(&self) -> Result<String> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Version {
            version: String,
        }

        let response = self.client.post(self.rpc_url("version")).send().await?;
        let version: Version = self.handle_response(response, "version").await?;
        Ok(version.version)
    }

    // ==================== Helper Methods ====================

    async fn rpc_failure(response: reqwest::Response, address: &str) -> ClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::NOT_FOUND {
            return ClientError::NotFound(address.to_string());
        }

        let message = serde_json::from_str::<RpcError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);

        if message.contains("not found") || message.contains("no link named") {
            return ClientError::NotFound(address.to_string());
        }

        ClientError::Server {
            status: status.as_u16(),
            message,
        }
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
        command: &str,
    ) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::rpc_failure(response, command).await);
        }

        let body = response.json().await?;
        Ok(body)
    }
}
