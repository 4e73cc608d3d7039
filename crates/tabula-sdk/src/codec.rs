//! Content address codec

use crate::address::ContentAddress;
use crate::error::{Result, TabulaError};
use crate::traits::ContentStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default time allowed for resolving an address
pub const DEFAULT_DECODE_TIMEOUT: Duration = Duration::from_secs(30);

/// Stores bytes in a content store and resolves addresses back to bytes
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct ContentAddressCodec {
    store: Arc<dyn ContentStore>,
    decode_timeout: Duration,
}

impl ContentAddressCodec {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            decode_timeout: DEFAULT_DECODE_TIMEOUT,
        }
    }

    /// Bound the time spent resolving an address
    ///
    /// Content that is not reachable anywhere never produces an error from
    /// an IPFS node, it just never arrives. Hitting this bound is reported
    /// as `NotFound`.
    pub fn with_decode_timeout(mut self, timeout: Duration) -> Self {
        self.decode_timeout = timeout;
        self
    }

    pub fn decode_timeout(&self) -> Duration {
        self.decode_timeout
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Store `bytes`, returning their address
    pub async fn encode(&self, bytes: &[u8]) -> Result<ContentAddress> {
        let address = self.store.add(bytes).await?;
        debug!(address = %address, bytes = bytes.len(), "Encoded content");
        Ok(address)
    }

    /// Store a UTF-8 string
    pub async fn encode_text(&self, text: &str) -> Result<ContentAddress> {
        self.encode(text.as_bytes()).await
    }

    /// Fetch the bytes behind `address`
    pub async fn decode(&self, address: &ContentAddress) -> Result<Vec<u8>> {
        match tokio::time::timeout(self.decode_timeout, self.store.cat(address)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    address = %address,
                    timeout_secs = self.decode_timeout.as_secs(),
                    "Content did not resolve in time"
                );
                Err(TabulaError::NotFound(address.to_string()))
            }
        }
    }

    /// Fetch and interpret as UTF-8 text
    pub async fn decode_text(&self, address: &ContentAddress) -> Result<String> {
        let bytes = self.decode(address).await?;
        String::from_utf8(bytes).map_err(|e| {
            TabulaError::Serialization(format!("content at {} is not UTF-8: {}", address, e))
        })
    }
}
