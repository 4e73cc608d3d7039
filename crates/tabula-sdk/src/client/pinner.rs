//! Pinning through a remote service or the local IPFS node

use crate::address::ContentAddress;
use crate::error::{Result, TabulaError};
use crate::traits::RemotePinner;
use async_trait::async_trait;
use tabula_client::{IpfsClient, PinningClient};
use tracing::debug;

#[async_trait]
impl RemotePinner for PinningClient {
    async fn pin(&self, address: &ContentAddress, label: &str) -> Result<()> {
        PinningClient::pin(self, address.as_str(), label)
            .await
            .map_err(TabulaError::from_store)
    }
}

/// Pins on the node the content was added to; the node keeps no labels
#[async_trait]
impl RemotePinner for IpfsClient {
    async fn pin(&self, address: &ContentAddress, label: &str) -> Result<()> {
        IpfsClient::pin_add(self, address.as_str())
            .await
            .map_err(TabulaError::from_store)?;
        debug!(%address, %label, "Pinned on local node");
        Ok(())
    }
}
