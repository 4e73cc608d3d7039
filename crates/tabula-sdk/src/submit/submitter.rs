//! Transaction submission
//!
//! Thin layer over a [`ChainWriter`]: checks the preconditions that must
//! hold before anything is sent, posts the wire body, bounds the confirmation
//! wait and derives the log entry id from the receipt.

use super::log_id::{ActionTag, LogEntryId};
use crate::body::WireBody;
use crate::error::{Result, TabulaError};
use crate::traits::{ChainError, ChainWriter, Receipt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tag the post log contract indexes entries under
pub const DEFAULT_POST_TAG: &str = "PUBLICATION";

/// Default bound on the confirmation wait
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Address of the post log contract; `None` until configured
    pub contract_address: Option<String>,
    pub post_tag: String,
    pub confirmation_timeout: Duration,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            contract_address: None,
            post_tag: DEFAULT_POST_TAG.to_string(),
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

/// Outcome of a confirmed submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub chain_id: u64,
    pub receipt: Receipt,
    pub log_entry_id: LogEntryId,
}

/// Posts log entries through a signer-bound contract handle
#[derive(Clone)]
pub struct TransactionSubmitter {
    signer: Option<Arc<dyn ChainWriter>>,
    config: SubmitterConfig,
}

impl TransactionSubmitter {
    pub fn new(signer: Option<Arc<dyn ChainWriter>>, config: SubmitterConfig) -> Self {
        Self { signer, config }
    }

    /// Bind (or replace) the signer, e.g. after a wallet connects
    pub fn with_signer(mut self, signer: Arc<dyn ChainWriter>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    /// Submit `body` and wait for confirmation
    ///
    /// `expected_chain` is the network the mutation targets; a signer
    /// connected elsewhere fails with `ChainMismatch` before anything is sent.
    pub async fn submit(&self, body: &WireBody, tag: ActionTag, expected_chain: u64) -> Result<Submission> {
        let signer = self.signer.as_ref().ok_or(TabulaError::SignerUnavailable)?;

        let contract = self
            .config
            .contract_address
            .as_deref()
            .filter(|address| !address.trim().is_empty())
            .ok_or(TabulaError::ContractUnavailable)?;

        let connected = signer.chain_id().await.map_err(map_chain_error)?;
        if connected != expected_chain {
            warn!(expected = expected_chain, connected, "Signer connected to the wrong network");
            return Err(TabulaError::ChainMismatch {
                expected: expected_chain,
                connected,
            });
        }

        debug!(chain_id = connected, tag = %tag, bytes = body.as_str().len(), "Submitting log entry");

        let timeout = self.config.confirmation_timeout;
        let receipt = match tokio::time::timeout(
            timeout,
            signer.post(contract, body.as_str(), &self.config.post_tag),
        )
        .await
        {
            Ok(result) => result.map_err(map_chain_error)?,
            Err(_) => return Err(TabulaError::ConfirmationTimedOut(timeout.as_secs())),
        };

        let log_entry_id = LogEntryId::derive(connected, tag, &receipt)?;
        info!(
            log_entry_id = %log_entry_id,
            tx = %receipt.transaction_hash,
            "Transaction confirmed"
        );

        Ok(Submission {
            chain_id: connected,
            receipt,
            log_entry_id,
        })
    }
}

fn map_chain_error(err: ChainError) -> TabulaError {
    match err {
        ChainError::Reverted(reason) => TabulaError::TransactionReverted(reason),
        other => TabulaError::TransactionFailed(other.to_string()),
    }
}
