//! GraphQL client for the publication index (read-model)

use crate::error::{ClientError, Result};
use crate::types::{Article, Publication, RequestPolicy, SubgraphConfig};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

const PERMISSIONS: &str = "
  permissions {
    id
    address
    articleCreate
    articleDelete
    articleUpdate
    publicationDelete
    publicationPermissions
    publicationUpdate
  }";

fn publication_fields() -> String {
    format!(
        "
  id
  hash
  description
  image
  tags
  title
  lastUpdated
  {}",
        PERMISSIONS
    )
}

fn article_fields() -> String {
    format!(
        "
  id
  title
  tags
  poster
  lastUpdated
  postedOn
  image
  authors
  description
  article
  publication {{ {} }}",
        publication_fields()
    )
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Responses kept before the cache is flushed
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Client for the GraphQL index
///
/// Keeps a bounded response cache so `CacheFirst` reads do not hit the
/// network. `NetworkOnly` reads always go to the index; they refresh a
/// response that is already cached but never add one.
pub struct SubgraphClient {
    config: SubgraphConfig,
    client: Client,
    cache: Mutex<HashMap<String, serde_json::Value>>,
    cache_capacity: usize,
}

impl SubgraphClient {
    /// Create a new index client
    pub fn new(config: SubgraphConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            cache: Mutex::new(HashMap::new()),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        })
    }

    /// Flush the cache once it holds `capacity` responses
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// GraphQL endpoint this client queries
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Fetch a publication with its permissions and articles
    pub async fn publication(&self, id: &str, policy: RequestPolicy) -> Result<Option<Publication>> {
        let query = format!(
            "query getPublication($id: String!) {{ publication(id: $id) {{ {} articles(orderDirection: asc) {{ {} }} }} }}",
            publication_fields(),
            article_fields()
        );
        self.query_field(&query, serde_json::json!({ "id": id }), "publication", policy)
            .await
    }

    /// Fetch a single article
    pub async fn article(&self, id: &str, policy: RequestPolicy) -> Result<Option<Article>> {
        let query = format!(
            "query getArticle($id: String!) {{ article(id: $id) {{ {} }} }}",
            article_fields()
        );
        self.query_field(&query, serde_json::json!({ "id": id }), "article", policy)
            .await
    }

    /// All publications, most recently updated first
    pub async fn publications(&self, policy: RequestPolicy) -> Result<Vec<Publication>> {
        let query = format!(
            "query getPublications {{ publications(orderBy: lastUpdated, orderDirection: desc) {{ {} }} }}",
            publication_fields()
        );
        Ok(self
            .query_field(&query, serde_json::json!({}), "publications", policy)
            .await?
            .unwrap_or_default())
    }

    /// Articles of a publication, most recently updated first
    pub async fn articles(&self, publication_id: &str, policy: RequestPolicy) -> Result<Vec<Article>> {
        let query = format!(
            "query getArticles($publicationId: ID) {{ articles(where: {{ publication: $publicationId }}, orderBy: lastUpdated, orderDirection: desc) {{ {} }} }}",
            article_fields()
        );
        Ok(self
            .query_field(
                &query,
                serde_json::json!({ "publicationId": publication_id }),
                "articles",
                policy,
            )
            .await?
            .unwrap_or_default())
    }

    /// Drop every cached response
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    /// Number of cached responses
    pub async fn cached_responses(&self) -> usize {
        self.cache.lock().await.len()
    }

    // ==================== Helper Methods ====================

    async fn query_field<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        field: &str,
        policy: RequestPolicy,
    ) -> Result<Option<T>> {
        let key = format!("{}:{}", field, variables);

        if policy == RequestPolicy::CacheFirst {
            if let Some(cached) = self.cache.lock().await.get(&key) {
                return Self::decode_field(cached.clone());
            }
        }

        let mut request = self.client.post(&self.config.endpoint).json(&GraphQlRequest {
            query,
            variables: &variables,
        });
        if policy == RequestPolicy::NetworkOnly {
            request = request
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Server { status, message });
        }

        let body: GraphQlResponse = response.json().await?;
        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            let joined = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ClientError::GraphQl(joined));
        }

        let value = body
            .data
            .ok_or_else(|| ClientError::InvalidResponse("response carries no data".into()))?
            .get(field)
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        self.remember(key, &value, policy).await;
        Self::decode_field(value)
    }

    async fn remember(&self, key: String, value: &serde_json::Value, policy: RequestPolicy) {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get_mut(&key) {
            *cached = value.clone();
            return;
        }
        if policy == RequestPolicy::NetworkOnly || self.cache_capacity == 0 {
            return;
        }
        if cache.len() >= self.cache_capacity {
            debug!(entries = cache.len(), "Index response cache full, flushing");
            cache.clear();
        }
        cache.insert(key, value.clone());
    }

    fn decode_field<T: DeserializeOwned>(value: serde_json::Value) -> Result<Option<T>> {
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }
}
