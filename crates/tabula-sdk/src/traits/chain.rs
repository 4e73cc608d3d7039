//! Signer-bound contract handle

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Log emitted by a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRef {
    pub log_index: u64,
}

/// Confirmation receipt of a post transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: String,
    pub block_hash: String,
    #[serde(default)]
    pub logs: Vec<LogRef>,
}

/// Failure reported by the chain collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// Mined, but execution reverted
    #[error("reverted: {0}")]
    Reverted(String),

    /// Rejected before inclusion (user denied, nonce, gas, ...)
    #[error("rejected: {0}")]
    Rejected(String),

    /// RPC transport failure
    #[error("transport: {0}")]
    Transport(String),
}

/// Contract handle bound to a signer
///
/// `post` sends the log entry and resolves once the transaction is
/// confirmed. Waiting may take arbitrarily long; callers bound it.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    /// Chain id of the network the signer is connected to
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Call `post(content, tag)` on `contract` and wait for the receipt
    async fn post(&self, contract: &str, content: &str, tag: &str) -> Result<Receipt, ChainError>;
}
