//! Remote pinning service client
//!
//! Speaks two dialects:
//! - Pinata's `pinByHash` API
//! - The IPFS Pinning Service API (`/pins`), used by Estuary, web3.storage,
//!   nft.storage and self-hosted services

use crate::error::{ClientError, Result};
use crate::types::{PinStatus, PinningConfig, PinningService};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinataPinRequest<'a> {
    hash_to_pin: &'a str,
    pinata_metadata: PinataMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct PinataMetadata<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct PinataPinList {
    #[serde(default)]
    count: u64,
}

#[derive(Debug, Serialize)]
struct ServicePinRequest<'a> {
    cid: &'a str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ServicePinResults {
    #[serde(default)]
    results: Vec<ServicePinStatus>,
}

#[derive(Debug, Deserialize)]
struct ServicePinStatus {
    status: String,
}

/// Client for a remote pinning service
#[derive(Clone)]
pub struct PinningClient {
    service: PinningService,
    endpoint: String,
    client: Client,
}

impl PinningClient {
    /// Create a new pinning client
    ///
    /// Fails for `NONE`/`PUBLIC` (nothing to talk to) and when no endpoint
    /// can be derived.
    pub fn new(config: PinningConfig) -> Result<Self> {
        if !config.service.is_remote() {
            return Err(ClientError::Config(format!(
                "pinning service {} does not accept pin requests",
                config.service
            )));
        }

        let endpoint = if config.endpoint.is_empty() {
            config.service.default_endpoint().to_string()
        } else {
            config.endpoint.clone()
        };
        if endpoint.is_empty() {
            return Err(ClientError::Config("pinning endpoint is required".into()));
        }

        let mut headers = header::HeaderMap::new();
        if !config.access_token.is_empty() {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", config.access_token))
                .map_err(|e| ClientError::Config(format!("invalid access token: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            service: config.service,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// The service this client is bound to
    pub fn service(&self) -> PinningService {
        self.service
    }

    /// Request that the service retains `address`, labelled `name`
    pub async fn pin(&self, address: &str, name: &str) -> Result<()> {
        let request = match self.service {
            PinningService::Pinata => self
                .client
                .post(format!("{}/pinning/pinByHash", self.endpoint))
                .json(&PinataPinRequest {
                    hash_to_pin: address,
                    pinata_metadata: PinataMetadata { name },
                }),
            _ => self
                .client
                .post(format!("{}/pins", self.endpoint))
                .json(&ServicePinRequest { cid: address, name }),
        };

        let response = request.send().await?;
        Self::check_status(response).await?;
        tracing::debug!(%address, %name, service = %self.service, "Pin requested");
        Ok(())
    }

    /// Current pin status of `address` on the service
    pub async fn status(&self, address: &str) -> Result<PinStatus> {
        match self.service {
            PinningService::Pinata => {
                let url = format!(
                    "{}/data/pinList?hashContains={}&status=pinned",
                    self.endpoint,
                    urlencoding::encode(address)
                );
                let response = Self::check_status(self.client.get(&url).send().await?).await?;
                let list: PinataPinList = response.json().await?;
                Ok(if list.count > 0 {
                    PinStatus::Pinned
                } else {
                    PinStatus::Unknown
                })
            }
            _ => {
                let url = format!("{}/pins?cid={}", self.endpoint, urlencoding::encode(address));
                let response = Self::check_status(self.client.get(&url).send().await?).await?;
                let results: ServicePinResults = response.json().await?;
                Ok(results
                    .results
                    .first()
                    .map(|r| PinStatus::from_service(&r.status))
                    .unwrap_or(PinStatus::Unknown))
            }
        }
    }

    /// Verify endpoint and token are accepted by the service
    pub async fn check_credentials(&self) -> Result<bool> {
        let url = match self.service {
            PinningService::Pinata => format!("{}/data/testAuthentication", self.endpoint),
            _ => format!("{}/pins?limit=1", self.endpoint),
        };

        let response = self.client.get(&url).send().await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            s => {
                let message = response.text().await.unwrap_or_default();
                Err(ClientError::Server {
                    status: s.as_u16(),
                    message,
                })
            }
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(ClientError::Server { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(service: PinningService, server: &MockServer) -> PinningClient {
        PinningClient::new(PinningConfig {
            service,
            endpoint: server.uri(),
            access_token: "token".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_public_and_none_are_rejected() {
        for service in [PinningService::Public, PinningService::None] {
            let result = PinningClient::new(PinningConfig {
                service,
                ..Default::default()
            });
            assert!(matches!(result, Err(ClientError::Config(_))));
        }
    }

    #[test]
    fn test_custom_requires_endpoint() {
        let result = PinningClient::new(PinningConfig {
            service: PinningService::Custom,
            access_token: "token".into(),
            ..Default::default()
        });
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_pinata_pin_by_hash() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pinning/pinByHash"))
            .and(header("authorization", "Bearer token"))
            .and(body_json(serde_json::json!({
                "hashToPin": "Qm123",
                "pinataMetadata": { "name": "1-A-0xabc-0-0xblock-0" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "job-1", "ipfsHash": "Qm123", "status": "prechecking"
            })))
            .expect(1)
            .mount(&server)
            .await;

        client(PinningService::Pinata, &server)
            .pin("Qm123", "1-A-0xabc-0-0xblock-0")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_pinning_service_api_pin_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pins"))
            .and(body_json(serde_json::json!({ "cid": "Qm123", "name": "label" })))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "requestid": "r1", "status": "queued"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pins"))
            .and(query_param("cid", "Qm123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 1,
                "results": [{ "requestid": "r1", "status": "pinned" }]
            })))
            .mount(&server)
            .await;

        let client = client(PinningService::Custom, &server);
        client.pin("Qm123", "label").await.unwrap();
        assert_eq!(client.status("Qm123").await.unwrap(), PinStatus::Pinned);
    }

    #[tokio::test]
    async fn test_pin_failure_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pins"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let err = client(PinningService::Estuary, &server)
            .pin("Qm123", "label")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_check_credentials_rejected_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/testAuthentication"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let valid = client(PinningService::Pinata, &server)
            .check_credentials()
            .await
            .unwrap();
        assert!(!valid);
    }
}
