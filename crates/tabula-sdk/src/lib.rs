//! Tabula SDK - publishing to an on-chain post log
//!
//! Every mutation (publication, article, permission) is a JSON action posted
//! to a single append-only contract. An external indexer later materializes
//! the log into queryable entities, so a confirmed write is not yet a
//! visible one. This crate covers both halves:
//!
//! - **Content addressing**: [`ContentAddressCodec`] stores bytes in a
//!   content store; [`ArticleBodyBuilder`] turns form input into log entries,
//!   lifting embedded media out of rich text and deciding whether the body is
//!   stored by address or inlined on chain.
//! - **Reconciliation**: [`TransactionSubmitter`] posts an entry and derives
//!   its log entry id; [`IndexReconciler`] polls the index until it reflects
//!   the write; [`PinningCoordinator`] pins the content afterwards.
//!
//! [`Publisher`] runs the whole pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabula_sdk::{ArticleForm, Publisher};
//!
//! let ticket = publisher
//!     .create_article(&ArticleForm {
//!         publication_id: "11155111-P-0xabc-0".into(),
//!         title: "Hello".into(),
//!         rich_text_html: "<p>hi</p>".into(),
//!         ..Default::default()
//!     }, 11155111)
//!     .await?;
//!
//! // Indexing... then pinned
//! let settled = ticket.settle().await?;
//! ```

// Collaborator seams
pub mod traits;

// Trait implementations over tabula-client, in-memory store
pub mod client;

pub mod address;
pub mod body;
pub mod codec;
pub mod config;
pub mod draft;
pub mod network;
pub mod pinning;
pub mod publisher;
pub mod reconcile;
pub mod submit;

// Error types
pub mod error;

pub use address::{ContentAddress, DEFAULT_GATEWAY};
pub use body::{
    ArticleBodyBuilder, ArticleForm, BuiltBody, ImageInput, LogAction, PermissionFlags, PermissionForm,
    PublicationForm, TagOption, WireBody,
};
pub use client::MemoryStore;
pub use codec::ContentAddressCodec;
pub use config::Config;
pub use network::{Network, NetworkRegistry};
pub use pinning::{PinReport, PinRequest, PinningCoordinator, PinningPolicy};
pub use publisher::{MutationTicket, Publisher, ReadModels, SettledMutation};
pub use reconcile::{
    Baseline, IndexReconciler, MutationKind, PendingMutation, ReconcileHandle, ReconcileStatus,
    ReconcilerConfig, Reconciliation, ReconciliationState,
};
pub use submit::{ActionTag, LogEntryId, Submission, TransactionSubmitter};
pub use traits::{ChainWriter, ContentStore, EntityKind, EntityRef, IndexedEntity, ReadModel, RemotePinner};

pub use error::{Result, TabulaError};

// Re-export from underlying crates
pub use tabula_client::{PinningService, RequestPolicy};
