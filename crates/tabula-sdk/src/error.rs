//! Error types for the Tabula SDK

use tabula_client::ClientError;
use thiserror::Error;

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, TabulaError>;

/// SDK error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TabulaError {
    /// Content store could not be reached or refused the request
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Content address could not be resolved
    #[error("Content not found: {0}")]
    NotFound(String),

    /// No signer is bound to the contract handle
    #[error("Signer not available")]
    SignerUnavailable,

    /// Target contract address is unset
    #[error("Contract is not available")]
    ContractUnavailable,

    /// Connected network differs from the network the mutation targets
    #[error("Wrong network: connected to chain {connected}, expected chain {expected}")]
    ChainMismatch { expected: u64, connected: u64 },

    /// Transaction was mined but reverted
    #[error("Transaction reverted: {0}")]
    TransactionReverted(String),

    /// Transaction could not be sent or confirmed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Confirmation did not arrive within the configured window
    #[error("Transaction confirmation timed out after {0}s")]
    ConfirmationTimedOut(u64),

    /// Read-model transport or query failure
    #[error("Read-model error: {0}")]
    ReadModelError(String),

    /// Index did not reflect the write within the configured window
    #[error("Indexing timed out after {0}s")]
    IndexingTimedOut(u64),

    /// Reconciliation was abandoned before it converged
    #[error("Reconciliation abandoned")]
    Abandoned,

    /// Form input violates a precondition
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Event not valid in the current reconciliation state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TabulaError {
    /// Map a content store client failure
    pub fn from_store(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(address) => TabulaError::NotFound(address),
            other => TabulaError::StorageUnavailable(other.to_string()),
        }
    }

    /// Map a read-model client failure
    pub fn from_read_model(err: ClientError) -> Self {
        TabulaError::ReadModelError(err.to_string())
    }
}

impl From<serde_json::Error> for TabulaError {
    fn from(err: serde_json::Error) -> Self {
        TabulaError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for TabulaError {
    fn from(err: toml::de::Error) -> Self {
        TabulaError::Config(err.to_string())
    }
}
