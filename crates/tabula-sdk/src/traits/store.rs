//! Content store trait

use crate::address::ContentAddress;
use crate::error::Result;
use async_trait::async_trait;

/// A content-addressed store
///
/// Implementations must be safe to share between tasks and must return the
/// same address for identical bytes.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `content`, returning its address
    ///
    /// Fails with `StorageUnavailable` when the store cannot be reached.
    async fn add(&self, content: &[u8]) -> Result<ContentAddress>;

    /// Read the bytes behind `address`
    ///
    /// Fails with `NotFound` when the address cannot be resolved and with
    /// `StorageUnavailable` on transport failure.
    async fn cat(&self, address: &ContentAddress) -> Result<Vec<u8>>;
}
