//! Mutation pipeline
//!
//! build → submit → reconcile → pin. Builder and submitter failures abort
//! before or at the chain write; once the write confirmed, failures only
//! affect what the caller is told about indexing and pinning.

use crate::body::{ArticleBodyBuilder, ArticleForm, BuiltBody, PermissionForm, PublicationForm};
use crate::error::{Result, TabulaError};
use crate::network::NetworkRegistry;
use crate::pinning::{PinReport, PinRequest, PinningCoordinator};
use crate::reconcile::{
    IndexReconciler, MutationKind, PendingMutation, ReconcileHandle, ReconcileStatus, ReconcilerConfig,
};
use crate::submit::{LogEntryId, Submission, TransactionSubmitter};
use crate::traits::{EntityRef, IndexedEntity, ReadModel};
use std::collections::HashMap;
use std::sync::Arc;
use tabula_client::RequestPolicy;
use tracing::info;

/// Read model per chain
///
/// Every network has its own index deployment, so the read model is picked
/// by the chain a mutation is written to.
#[derive(Clone, Default)]
pub struct ReadModels {
    by_chain: HashMap<u64, Arc<dyn ReadModel>>,
}

impl ReadModels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, chain_id: u64, read_model: Arc<dyn ReadModel>) -> Self {
        self.by_chain.insert(chain_id, read_model);
        self
    }

    pub fn insert(&mut self, chain_id: u64, read_model: Arc<dyn ReadModel>) {
        self.by_chain.insert(chain_id, read_model);
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.by_chain.contains_key(&chain_id)
    }

    /// Read model of `chain_id`; chains without an index are rejected
    pub fn get(&self, chain_id: u64) -> Result<Arc<dyn ReadModel>> {
        self.by_chain
            .get(&chain_id)
            .cloned()
            .ok_or_else(|| TabulaError::Config(format!("no index configured for chain {}", chain_id)))
    }
}

/// Runs mutations on any configured network
#[derive(Clone)]
pub struct Publisher {
    builder: ArticleBodyBuilder,
    submitter: TransactionSubmitter,
    read_models: ReadModels,
    reconciler_config: ReconcilerConfig,
    pinning: PinningCoordinator,
    networks: NetworkRegistry,
}

/// A confirmed mutation whose indexing is being watched
#[derive(Debug)]
pub struct MutationTicket {
    pub log_entry_id: LogEntryId,
    pub transaction_url: String,
    pub submission: Submission,
    /// Addresses and labels pinned once the mutation converges
    pub pin_requests: Vec<PinRequest>,
    reconciliation: ReconcileHandle,
    pinning: PinningCoordinator,
}

/// Final outcome of a mutation
#[derive(Debug, Clone)]
pub struct SettledMutation {
    pub log_entry_id: LogEntryId,
    pub transaction_url: String,
    pub status: ReconcileStatus,
    pub pins: PinReport,
}

impl MutationTicket {
    pub fn status(&self) -> ReconcileStatus {
        self.reconciliation.status()
    }

    pub fn reconciliation(&self) -> &ReconcileHandle {
        &self.reconciliation
    }

    /// Stop watching; the write itself stays on chain
    pub fn abandon(&self) {
        self.reconciliation.abandon();
    }

    /// Wait for the index, then pin
    ///
    /// An indexing failure is returned as is and nothing is pinned. Pin
    /// failures never fail the mutation; they are listed in the report.
    pub async fn settle(self) -> Result<SettledMutation> {
        let status = self.reconciliation.wait().await?;
        let pins = self.pinning.on_converged(&self.pin_requests).await;
        Ok(SettledMutation {
            log_entry_id: self.log_entry_id,
            transaction_url: self.transaction_url,
            status,
            pins,
        })
    }
}

impl Publisher {
    pub fn new(
        builder: ArticleBodyBuilder,
        submitter: TransactionSubmitter,
        read_models: ReadModels,
        reconciler_config: ReconcilerConfig,
        pinning: PinningCoordinator,
        networks: NetworkRegistry,
    ) -> Self {
        Self {
            builder,
            submitter,
            read_models,
            reconciler_config,
            pinning,
            networks,
        }
    }

    pub fn builder(&self) -> &ArticleBodyBuilder {
        &self.builder
    }

    pub async fn create_publication(&self, form: &PublicationForm, chain_id: u64) -> Result<MutationTicket> {
        self.read_models.get(chain_id)?;
        let built = self.builder.publication_create(form).await?;
        self.publish(built, chain_id, None).await
    }

    pub async fn update_publication(
        &self,
        id: &str,
        form: &PublicationForm,
        chain_id: u64,
    ) -> Result<MutationTicket> {
        let current = self.snapshot(&EntityRef::publication(id), chain_id).await?;
        let built = self.builder.publication_update(id, form).await?;
        self.publish(built, chain_id, current.as_ref()).await
    }

    pub async fn delete_publication(&self, id: &str, chain_id: u64) -> Result<MutationTicket> {
        self.read_models.get(chain_id)?;
        let built = self.builder.publication_delete(id)?;
        self.publish(built, chain_id, None).await
    }

    pub async fn create_article(&self, form: &ArticleForm, chain_id: u64) -> Result<MutationTicket> {
        // Content is stored while building; check the network first
        self.read_models.get(chain_id)?;
        let built = self.builder.article_create(form).await?;
        self.publish(built, chain_id, None).await
    }

    pub async fn update_article(&self, id: &str, form: &ArticleForm, chain_id: u64) -> Result<MutationTicket> {
        let current = self.snapshot(&EntityRef::article(id), chain_id).await?;
        let built = self.builder.article_update(id, form).await?;
        self.publish(built, chain_id, current.as_ref()).await
    }

    pub async fn delete_article(&self, id: &str, chain_id: u64) -> Result<MutationTicket> {
        self.read_models.get(chain_id)?;
        let built = self.builder.article_delete(id)?;
        self.publish(built, chain_id, None).await
    }

    pub async fn set_permission(&self, form: &PermissionForm, chain_id: u64) -> Result<MutationTicket> {
        let current = self.snapshot(&EntityRef::publication(&form.publication_id), chain_id).await?;
        let built = self.builder.permission_set(form)?;
        self.publish(built, chain_id, current.as_ref()).await
    }

    /// Submit a built body and start watching the index of `chain_id`
    ///
    /// `current` is the entity as last seen, used as the baseline for
    /// updates. A chain without a configured index is rejected before
    /// anything is posted.
    pub async fn publish(
        &self,
        built: BuiltBody,
        chain_id: u64,
        current: Option<&IndexedEntity>,
    ) -> Result<MutationTicket> {
        let reconciler = IndexReconciler::new(self.read_models.get(chain_id)?, self.reconciler_config.clone());

        let submission = self
            .submitter
            .submit(&built.wire, built.action.tag(), chain_id)
            .await?;

        let log_entry_id = submission.log_entry_id.clone();
        let transaction_url = self
            .networks
            .transaction_url(submission.chain_id, &submission.receipt.transaction_hash);
        let pin_requests = pin_requests(&built, &log_entry_id, &submission.receipt.block_hash);

        let pending =
            PendingMutation::for_action(&built.action, current).with_content_addresses(built.pin_set());
        let reconciliation = reconciler.spawn(pending, log_entry_id.clone())?;

        info!(
            log_entry_id = %log_entry_id,
            action = built.action.action_name(),
            tx_url = %transaction_url,
            "Mutation submitted"
        );

        Ok(MutationTicket {
            log_entry_id,
            transaction_url,
            submission,
            pin_requests,
            reconciliation,
            pinning: self.pinning.clone(),
        })
    }

    /// Entity as the index of `chain_id` currently has it, bypassing caches
    async fn snapshot(&self, target: &EntityRef, chain_id: u64) -> Result<Option<IndexedEntity>> {
        if target.id.trim().is_empty() {
            return Err(TabulaError::InvalidInput("target id is required".into()));
        }
        self.read_models
            .get(chain_id)?
            .fetch(target, RequestPolicy::NetworkOnly)
            .await
    }
}

/// Labels are `{log_entry_id}-{block_hash}` for the cover image and the same
/// base with `-{i}` for body addresses. Deletes pin nothing.
fn pin_requests(built: &BuiltBody, log_entry_id: &LogEntryId, block_hash: &str) -> Vec<PinRequest> {
    if built.action.mutation_kind() == MutationKind::Delete {
        return Vec::new();
    }

    let base = format!("{}-{}", log_entry_id, block_hash);
    let mut requests = PinRequest::numbered(&built.content_addresses, &base);
    if let Some(image) = &built.image {
        if !built.content_addresses.contains(image) {
            requests.push(PinRequest::new(image.clone(), base));
        }
    }
    requests
}
