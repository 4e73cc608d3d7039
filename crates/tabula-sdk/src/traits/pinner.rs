//! Remote pinning trait

use crate::address::ContentAddress;
use crate::error::Result;
use async_trait::async_trait;

/// Asks a remote service to retain content
#[async_trait]
pub trait RemotePinner: Send + Sync {
    /// Request a pin for `address` under `label`
    async fn pin(&self, address: &ContentAddress, label: &str) -> Result<()>;
}
