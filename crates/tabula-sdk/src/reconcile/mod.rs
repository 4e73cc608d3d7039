//! Transaction-to-index reconciliation
//!
//! A confirmed write is not visible to readers until the index has
//! materialized it. [`Reconciliation`] is the pure state machine deciding
//! when that has happened; [`IndexReconciler`] drives one machine per
//! mutation against a [`ReadModel`](crate::traits::ReadModel).

pub mod driver;
pub mod machine;
pub mod pending;

pub use driver::{IndexReconciler, ReconcileHandle, ReconcilerConfig};
pub use machine::{ReconcileEvent, ReconcileStatus, Reconciliation, ReconciliationState};
pub use pending::{Baseline, MutationKind, PendingMutation};
