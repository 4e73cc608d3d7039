//! Post-convergence pinning
//!
//! Pinning only improves availability. Failures are logged and reported per
//! address and never affect the mutation they belong to.

use crate::address::ContentAddress;
use crate::error::Result;
use crate::reconcile::ReconcileHandle;
use crate::traits::RemotePinner;
use serde::Serialize;
use std::sync::Arc;
use tabula_client::PinningService;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What happens to content addresses once a mutation is indexed
#[derive(Clone)]
pub enum PinningPolicy {
    /// Content lives on chain; nothing to pin
    OnChain,
    /// Rely on public gateways
    Public,
    /// Pin through a remote service
    Remote(Arc<dyn RemotePinner>),
}

impl PinningPolicy {
    /// Policy for a configured service
    ///
    /// `pinner` is only consulted for remote services; a remote service
    /// without a pinner falls back to public availability.
    pub fn for_service(service: PinningService, pinner: Option<Arc<dyn RemotePinner>>) -> Self {
        match (service, pinner) {
            (PinningService::None, _) => PinningPolicy::OnChain,
            (PinningService::Public, _) | (_, None) => PinningPolicy::Public,
            (_, Some(pinner)) => PinningPolicy::Remote(pinner),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PinningPolicy::OnChain => "on_chain",
            PinningPolicy::Public => "public",
            PinningPolicy::Remote(_) => "remote",
        }
    }
}

impl std::fmt::Debug for PinningPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One address to pin and the label to pin it under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinRequest {
    pub address: ContentAddress,
    pub label: String,
}

impl PinRequest {
    pub fn new(address: ContentAddress, label: impl Into<String>) -> Self {
        Self {
            address,
            label: label.into(),
        }
    }

    /// Label addresses `{base}-{i}` in order
    pub fn numbered(addresses: &[ContentAddress], base: &str) -> Vec<Self> {
        addresses
            .iter()
            .enumerate()
            .map(|(i, address)| Self::new(address.clone(), format!("{}-{}", base, i)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinOutcome {
    pub address: ContentAddress,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PinOutcome {
    pub fn is_pinned(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinReport {
    pub policy: &'static str,
    /// One entry per request, in request order; empty when the policy
    /// skips pinning
    pub outcomes: Vec<PinOutcome>,
}

impl PinReport {
    fn skipped(policy: &PinningPolicy) -> Self {
        Self {
            policy: policy.name(),
            outcomes: Vec::new(),
        }
    }

    pub fn pinned(&self) -> impl Iterator<Item = &PinOutcome> {
        self.outcomes.iter().filter(|o| o.is_pinned())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PinOutcome> {
        self.outcomes.iter().filter(|o| !o.is_pinned())
    }

    pub fn all_pinned(&self) -> bool {
        self.outcomes.iter().all(PinOutcome::is_pinned)
    }
}

/// Applies the pinning policy once a mutation has converged
#[derive(Clone, Debug)]
pub struct PinningCoordinator {
    policy: PinningPolicy,
}

impl PinningCoordinator {
    pub fn new(policy: PinningPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PinningPolicy {
        &self.policy
    }

    /// Pin every request, one at a time, in order
    pub async fn on_converged(&self, requests: &[PinRequest]) -> PinReport {
        let pinner = match &self.policy {
            PinningPolicy::Remote(pinner) => pinner,
            other => {
                debug!(policy = other.name(), count = requests.len(), "Pinning skipped");
                return PinReport::skipped(other);
            }
        };

        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            let error = match pinner.pin(&request.address, &request.label).await {
                Ok(()) => {
                    debug!(address = %request.address, label = %request.label, "Pinned");
                    None
                }
                Err(err) => {
                    warn!(
                        address = %request.address,
                        label = %request.label,
                        error = %err,
                        "Pin request failed"
                    );
                    Some(err.to_string())
                }
            };
            outcomes.push(PinOutcome {
                address: request.address.clone(),
                label: request.label.clone(),
                error,
            });
        }

        let report = PinReport {
            policy: self.policy.name(),
            outcomes,
        };
        info!(
            pinned = report.pinned().count(),
            failed = report.failed().count(),
            "Pinning finished"
        );
        report
    }

    /// Pin in the background once `reconciliation` converges
    ///
    /// Resolves to the reconciliation error when it does not converge; no
    /// pin is requested in that case.
    pub fn spawn_on_converged(
        &self,
        reconciliation: ReconcileHandle,
        requests: Vec<PinRequest>,
    ) -> JoinHandle<Result<PinReport>> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            reconciliation.wait().await?;
            Ok(coordinator.on_converged(&requests).await)
        })
    }
}
