//! Content stores: the IPFS HTTP API, and an in-process store for tests and offline use

use crate::address::ContentAddress;
use crate::error::{Result, TabulaError};
use crate::traits::ContentStore;
use async_trait::async_trait;
use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tabula_client::IpfsClient;
use tokio::sync::RwLock;

#[async_trait]
impl ContentStore for IpfsClient {
    async fn add(&self, bytes: &[u8]) -> Result<ContentAddress> {
        let added = IpfsClient::add(self, bytes).await.map_err(TabulaError::from_store)?;
        Ok(ContentAddress::unchecked(added.hash))
    }

    async fn cat(&self, address: &ContentAddress) -> Result<Vec<u8>> {
        IpfsClient::cat(self, address.as_str())
            .await
            .map_err(TabulaError::from_store)
    }
}

/// In-memory content store
///
/// Addresses are CIDv0 over the sha2-256 of the raw bytes. They have the
/// same shape as IPFS addresses but are not what a node would assign, since
/// no UnixFS wrapping happens here.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address `bytes` would be stored under
    pub fn address_of(bytes: &[u8]) -> ContentAddress {
        let cid = Cid::new_v0(Code::Sha2_256.digest(bytes))
            .unwrap_or_else(|_| Cid::new_v1(0x55, Code::Sha2_256.digest(bytes)));
        ContentAddress::from_cid(&cid)
    }

    /// Simulate the store going away; every call fails with `StorageUnavailable`
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    pub async fn contains(&self, address: &ContentAddress) -> bool {
        self.blobs.read().await.contains_key(address.as_str())
    }

    fn check_available(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TabulaError::StorageUnavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn add(&self, bytes: &[u8]) -> Result<ContentAddress> {
        self.check_available()?;
        let address = Self::address_of(bytes);
        self.blobs
            .write()
            .await
            .entry(address.as_str().to_string())
            .or_insert_with(|| bytes.to_vec());
        Ok(address)
    }

    async fn cat(&self, address: &ContentAddress) -> Result<Vec<u8>> {
        self.check_available()?;
        self.blobs
            .read()
            .await
            .get(address.as_str())
            .cloned()
            .ok_or_else(|| TabulaError::NotFound(address.to_string()))
    }
}
